pub mod account;
pub mod catalog;

pub use account::{Account, AccountSummary, NewAccount, Role};
