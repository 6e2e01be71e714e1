pub use super::controls::Entity as Controls;
pub use super::fields::Entity as Fields;
pub use super::iso_standards::Entity as IsoStandards;
pub use super::questions::Entity as Questions;
pub use super::users::Entity as Users;
