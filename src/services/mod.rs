pub mod accounts;
pub use accounts::{AccountError, NewAccountRequest, create_account, list_accounts};

pub mod bootstrap;
pub use bootstrap::{
    BootstrapError, Outcome, SuperadminSeed, bootstrap_on_startup, ensure_privileged_account,
};

pub mod catalog;
pub use catalog::{SeedOutcome, seed_sample_catalog};

pub mod password;
pub use password::{PasswordError, PasswordScheme, hash_password, verify_password};
