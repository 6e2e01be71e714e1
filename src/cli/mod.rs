//! Command-line interface.

mod commands;

use clap::{Parser, Subcommand};

use crate::models::Role;

/// ValidS compliance backend: environment bootstrap and account tooling
#[derive(Parser)]
#[command(name = "valids")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ensure the superadmin account exists
    Bootstrap {
        /// Exit non-zero when the account cannot be ensured
        #[arg(long)]
        strict: bool,
    },

    /// Bootstrap the superadmin and seed sample compliance data
    Init {
        /// Only ensure the superadmin account
        #[arg(long)]
        skip_sample_data: bool,

        /// Exit non-zero when initialization fails
        #[arg(long)]
        strict: bool,
    },

    /// Create the superadmin account interactively
    CreateSuperuser {
        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Manage user accounts
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Serve the health API; bootstraps on startup when enabled
    #[command(alias = "daemon")]
    Serve,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user account
    Create {
        username: String,

        /// superadmin, auditor, spectator or employee
        #[arg(long)]
        role: Role,

        #[arg(long)]
        email: String,

        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,

        /// 24-character hex company id (ignored for superadmin)
        #[arg(long)]
        company_id: Option<String>,

        /// 0-50, employees only
        #[arg(long)]
        experience_years: Option<i32>,
    },

    /// List all user accounts
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default config.toml if none exists
    Init,

    /// Print the effective configuration
    Show,
}

pub use commands::*;
