use anyhow::Context;
use tracing::warn;

use super::{connect, prompt_if_missing};
use crate::config::Config;
use crate::db::{AccountStore, Store};
use crate::models::Role;
use crate::services::{NewAccountRequest, create_account};

pub async fn cmd_create_superuser(
    config: &Config,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let store = connect(config).await?;
    let result = create_superuser(&store, config, username, email, password).await;
    store.close().await;
    result
}

async fn create_superuser(
    store: &Store,
    config: &Config,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    if let Some(existing) = store.find_by_role(Role::Superadmin).await? {
        warn!("Superadmin user already exists");
        println!("Superadmin user already exists!");
        println!("Superadmin username: {}", existing.username);
        println!("Superadmin email: {}", existing.email);
        return Ok(());
    }

    println!("{:=<50}", "");
    println!("Creating Superadmin User for ValidS Compliance System");
    println!("{:=<50}", "");

    let request = NewAccountRequest {
        username: prompt_if_missing(username, "Enter superadmin username")?,
        role: Role::Superadmin,
        email: prompt_if_missing(email, "Enter superadmin email")?,
        password: prompt_if_missing(password, "Enter superadmin password (min 6 characters)")?,
        company_id: None,
        experience_years: None,
    };

    let account = create_account(store, &request, &config.security)
        .await
        .context("Failed to create superadmin")?;

    println!();
    println!("{:=<50}", "");
    println!("SUPERADMIN USER CREATED SUCCESSFULLY");
    println!("{:=<50}", "");
    println!("Username: {}", account.username);
    println!("Email: {}", account.email);
    println!("Role: {}", account.role);
    println!("User ID: {}", account.id);
    println!(
        "API docs: http://localhost:{}{}/docs",
        config.server.port, config.server.api_prefix
    );
    Ok(())
}
