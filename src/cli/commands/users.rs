//! User management command handlers

use anyhow::Context;

use super::{connect, prompt_if_missing};
use crate::config::Config;
use crate::models::{AccountSummary, Role};
use crate::services::{NewAccountRequest, create_account, list_accounts};

pub async fn cmd_users_create(
    config: &Config,
    username: String,
    role: Role,
    email: String,
    password: Option<String>,
    company_id: Option<String>,
    experience_years: Option<i32>,
) -> anyhow::Result<()> {
    let request = NewAccountRequest {
        username,
        role,
        email,
        password: prompt_if_missing(password, "Enter password (min 6 characters)")?,
        company_id,
        experience_years,
    };

    let store = connect(config).await?;
    let result = create_account(&store, &request, &config.security).await;
    store.close().await;

    let account = result.context("Failed to create user")?;

    println!("✅ User '{}' created successfully!", account.username);
    println!("User ID: {}", account.id);
    println!("Role: {} ({})", account.role, account.role.description());
    println!("Email: {}", account.email);
    Ok(())
}

pub async fn cmd_users_list(config: &Config) -> anyhow::Result<()> {
    let store = connect(config).await?;
    let result = list_accounts(&store).await;
    store.close().await;

    let users = result.context("Failed to list users")?;

    if users.is_empty() {
        println!("No users found in the system.");
        println!();
        println!("Create one with: valids users create <username> --role <role> --email <email>");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<88}", "");
    println!(
        "{:<20} {:<30} {:<12} {:<15} {:<8}",
        "Username", "Email", "Role", "Company", "Active"
    );
    println!("{:-<88}", "");

    for user in &users {
        println!("{}", format_row(user));
    }

    Ok(())
}

fn format_row(user: &AccountSummary) -> String {
    let company: String = user
        .company_id
        .as_deref()
        .map_or_else(|| "N/A".to_string(), |id| id.chars().take(14).collect());

    format!(
        "{:<20} {:<30} {:<12} {:<15} {:<8}",
        user.username,
        user.email,
        user.role.as_str(),
        company,
        if user.is_active { "yes" } else { "no" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn row_truncates_company_id() {
        let row = format_row(&AccountSummary {
            id: "1".to_string(),
            username: "jane".to_string(),
            role: Role::Auditor,
            email: "jane@example.com".to_string(),
            company_id: Some("507f1f77bcf86cd799439011".to_string()),
            is_active: true,
            created_at: Utc::now(),
        });

        assert!(row.starts_with("jane "));
        assert!(row.contains("507f1f77bcf86c "));
        assert!(!row.contains("507f1f77bcf86cd7"));
        assert!(row.trim_end().ends_with("yes"));
    }
}
