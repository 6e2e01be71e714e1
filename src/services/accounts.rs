//! Account management: validated user creation and listing.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{AccountStore, InsertOutcome, StoreError};
use crate::models::{Account, AccountSummary, NewAccount, Role};
use crate::services::password::{PasswordError, hash_password_blocking};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 100;
pub const MAX_EXPERIENCE_YEARS: i32 = 50;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hashing(#[from] PasswordError),
}

/// Input for [`create_account`]. The password is plaintext until hashed.
#[derive(Debug, Clone)]
pub struct NewAccountRequest {
    pub username: String,
    pub role: Role,
    pub email: String,
    pub password: String,
    pub company_id: Option<String>,
    pub experience_years: Option<i32>,
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"))
}

fn is_object_id(value: &str) -> bool {
    value.len() == 24 && value.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn validate_username(username: &str) -> Result<&str, AccountError> {
    let trimmed = username.trim();
    let len = trimmed.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AccountError::Validation(format!(
            "Username must be between 3 and 50 characters, got {}",
            len
        )));
    }
    Ok(trimmed)
}

pub fn validate_email(email: &str) -> Result<&str, AccountError> {
    let trimmed = email.trim();
    if !email_regex().is_match(trimmed) {
        return Err(AccountError::Validation(format!(
            "Invalid email address: {trimmed:?}"
        )));
    }
    Ok(trimmed)
}

pub fn validate_password(password: &str) -> Result<(), AccountError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AccountError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AccountError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

impl NewAccountRequest {
    /// Checks every field and normalises the role-dependent ones.
    ///
    /// A superadmin never belongs to a company; experience is only kept for
    /// employees.
    fn validate(&self) -> Result<NewAccountRequest, AccountError> {
        let username = validate_username(&self.username)?.to_string();
        let email = validate_email(&self.email)?.to_string();
        validate_password(&self.password)?;

        let company_id = match (self.role, self.company_id.as_deref().map(str::trim)) {
            (Role::Superadmin, _) | (_, None) | (_, Some("")) => None,
            (_, Some(id)) if is_object_id(id) => Some(id.to_string()),
            (_, Some(id)) => {
                return Err(AccountError::Validation(format!(
                    "Invalid company ID format: {id:?}"
                )));
            }
        };

        let experience_years = match (self.role, self.experience_years) {
            (Role::Employee, Some(years)) if !(0..=MAX_EXPERIENCE_YEARS).contains(&years) => {
                return Err(AccountError::Validation(format!(
                    "Experience must be between 0 and {MAX_EXPERIENCE_YEARS} years, got {years}"
                )));
            }
            (Role::Employee, years) => years,
            _ => None,
        };

        Ok(Self {
            username,
            role: self.role,
            email,
            password: self.password.clone(),
            company_id,
            experience_years,
        })
    }
}

/// Validates `request`, hashes its password and inserts the account.
pub async fn create_account<S>(
    store: &S,
    request: &NewAccountRequest,
    security: &SecurityConfig,
) -> Result<Account, AccountError>
where
    S: AccountStore + ?Sized,
{
    let request = request.validate()?;

    if let Some(existing) = store
        .find_by_username_or_email(&request.username, &request.email)
        .await?
    {
        let field = if existing.username == request.username {
            "Username"
        } else {
            "Email"
        };
        return Err(AccountError::Conflict(format!("{field} already in use")));
    }

    let digest = hash_password_blocking(request.password, security.clone()).await?;
    let mut account = NewAccount::new(request.username, request.role, request.email, digest);
    account.company_id = request.company_id;
    account.experience_years = request.experience_years;

    match store.insert_account(&account).await? {
        InsertOutcome::Inserted(id) => {
            info!(id = %id, username = %account.username, role = %account.role, "User created");
            store.get_account(&id).await?.ok_or_else(|| {
                AccountError::Store(StoreError::Query(format!(
                    "created user {id} could not be read back"
                )))
            })
        }
        InsertOutcome::Duplicate => Err(AccountError::Conflict(
            "A superadmin account already exists".to_string(),
        )),
    }
}

/// All accounts without password digests, in store order.
pub async fn list_accounts<S>(store: &S) -> Result<Vec<AccountSummary>, AccountError>
where
    S: AccountStore + ?Sized,
{
    Ok(store
        .list_accounts()
        .await?
        .into_iter()
        .map(AccountSummary::from)
        .collect())
}
