mod bootstrap;
mod config;
mod superuser;
mod users;

pub use bootstrap::{cmd_bootstrap, cmd_init, print_outcome};
pub use config::{cmd_config_init, cmd_config_show};
pub use superuser::cmd_create_superuser;
pub use users::{cmd_users_create, cmd_users_list};

use anyhow::Context;
use std::io::Write;

use crate::config::Config;
use crate::db::Store;
use crate::db::mongo::redact;

async fn connect(config: &Config) -> anyhow::Result<Store> {
    Store::connect(&config.database)
        .await
        .with_context(|| format!("Failed to connect to {}", redact(&config.database.url)))
}

/// Reads one trimmed line from stdin after printing `label`.
fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_if_missing(value: Option<String>, label: &str) -> anyhow::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt(label),
    }
}
