pub mod prelude;

pub mod controls;
pub mod fields;
pub mod iso_standards;
pub mod questions;
pub mod users;
