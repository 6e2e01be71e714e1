use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role as stored in the `roletype` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Auditor,
    Spectator,
    Employee,
}

impl Role {
    pub const ALL: [Self; 4] = [
        Self::Superadmin,
        Self::Auditor,
        Self::Spectator,
        Self::Employee,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Superadmin => "superadmin",
            Self::Auditor => "auditor",
            Self::Spectator => "spectator",
            Self::Employee => "employee",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Superadmin => "Full system access",
            Self::Auditor => "Can manage companies and users",
            Self::Spectator => "Can view company progress",
            Self::Employee => "Can submit compliance forms",
        }
    }

    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Superadmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown role: {s}"))
    }
}

/// A stored account, including its password digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub email: String,
    pub password_digest: String,
    pub company_id: Option<String>,
    pub experience_years: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An account that has not been written yet.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub role: Role,
    pub email: String,
    pub password_digest: String,
    pub company_id: Option<String>,
    pub experience_years: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewAccount {
    /// Active account with both timestamps set to now.
    #[must_use]
    pub fn new(username: String, role: Role, email: String, password_digest: String) -> Self {
        let now = Utc::now();
        Self {
            username,
            role,
            email,
            password_digest,
            company_id: None,
            experience_years: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Account data safe to display (no digest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub email: String,
    pub company_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            role: account.role,
            email: account.email,
            company_id: account.company_id,
            is_active: account.is_active,
            created_at: account.created_at,
        }
    }
}
