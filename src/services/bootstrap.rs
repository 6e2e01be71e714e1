//! Superadmin bootstrap.
//!
//! Runs once per process start and guarantees a privileged account exists.
//! The existence check and the insert are two separate store calls; the store
//! enforces at most one superadmin, so an insert that loses a race comes back
//! as [`InsertOutcome::Duplicate`] and is reported as already existing.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{BootstrapConfig, SecurityConfig};
use crate::db::{AccountStore, InsertOutcome, StoreError};
use crate::models::{NewAccount, Role};
use crate::services::accounts::{
    AccountError, validate_email, validate_password, validate_username,
};
use crate::services::password::{PasswordError, hash_password_blocking};

pub const DEFAULT_USERNAME: &str = "superadmin";
pub const DEFAULT_EMAIL: &str = "admin@valids.com";
pub const DEFAULT_PASSWORD: &str = "admin123";

/// Credentials used when the privileged account has to be created.
#[derive(Debug, Clone)]
pub struct SuperadminSeed {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    pub require_explicit_password: bool,
}

impl Default for SuperadminSeed {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            email: DEFAULT_EMAIL.to_string(),
            password: None,
            require_explicit_password: false,
        }
    }
}

impl SuperadminSeed {
    #[must_use]
    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self {
            username: config.username.clone(),
            email: config.email.clone(),
            password: config.password.clone(),
            require_explicit_password: config.require_explicit_password,
        }
    }

    /// A blank configured password counts as unset.
    fn explicit_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// Checks the seed credentials and returns the trimmed username and email.
    ///
    /// # Errors
    ///
    /// [`BootstrapError::InvalidSeed`] when the username, email or a configured
    /// password would be rejected for a regular account.
    pub fn validate(&self) -> Result<(&str, &str), BootstrapError> {
        let invalid = |e: AccountError| BootstrapError::InvalidSeed(e.to_string());

        let username = validate_username(&self.username).map_err(invalid)?;
        let email = validate_email(&self.email).map_err(invalid)?;
        if let Some(password) = self.explicit_password() {
            validate_password(password).map_err(invalid)?;
        }
        Ok((username, email))
    }

    /// Returns the password to seed and whether it is the built-in default.
    fn resolve_password(&self) -> Result<(String, bool), BootstrapError> {
        match self.explicit_password() {
            Some(password) => Ok((password.to_string(), false)),
            None if self.require_explicit_password => Err(BootstrapError::MissingPassword),
            None => Ok((DEFAULT_PASSWORD.to_string(), true)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    AlreadyExists {
        username: String,
        email: String,
    },

    Created {
        id: String,
        username: String,
        email: String,
        /// Plaintext of the built-in password when it was used. Sensitive.
        #[serde(skip_serializing)]
        default_password: Option<String>,
    },
}

impl Outcome {
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::AlreadyExists { username, .. } | Self::Created { username, .. } => username,
        }
    }

    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            Self::AlreadyExists { email, .. } | Self::Created { email, .. } => email,
        }
    }

    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } => "already_exists",
            Self::Created { .. } => "created",
        }
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Account store unreachable: {0}")]
    StoreUnreachable(String),

    #[error("Failed to write superadmin account: {0}")]
    WriteFailure(String),

    #[error("No superadmin password configured and the built-in default is disabled")]
    MissingPassword,

    #[error("Invalid superadmin seed: {0}")]
    InvalidSeed(String),

    #[error(transparent)]
    Hashing(#[from] PasswordError),
}

impl BootstrapError {
    const fn label(&self) -> &'static str {
        match self {
            Self::StoreUnreachable(_) => "store_unreachable",
            Self::WriteFailure(_) => "write_failure",
            Self::MissingPassword => "missing_password",
            Self::InvalidSeed(_) => "invalid_seed",
            Self::Hashing(_) => "hashing",
        }
    }
}

fn unreachable(err: StoreError) -> BootstrapError {
    BootstrapError::StoreUnreachable(err.to_string())
}

/// Makes sure an account with the superadmin role exists.
///
/// An existing superadmin is reported and left untouched. Otherwise one is
/// created from `seed`, with the password hashed according to `security`.
///
/// # Errors
///
/// - [`BootstrapError::InvalidSeed`] before any store access when the seed
///   credentials are malformed.
/// - [`BootstrapError::MissingPassword`] before any store access when the seed
///   has no password and the built-in default is disabled.
/// - [`BootstrapError::StoreUnreachable`] when the store cannot be pinged or queried.
///   Nothing is inserted in that case.
/// - [`BootstrapError::WriteFailure`] when the insert fails.
pub async fn ensure_privileged_account<S>(
    store: &S,
    seed: &SuperadminSeed,
    security: &SecurityConfig,
) -> Result<Outcome, BootstrapError>
where
    S: AccountStore + ?Sized,
{
    let (username, email) = seed.validate()?;
    let (password, default_used) = seed.resolve_password()?;

    store.ping().await.map_err(unreachable)?;

    if let Some(existing) = store
        .find_by_role(Role::Superadmin)
        .await
        .map_err(unreachable)?
    {
        info!(
            username = %existing.username,
            email = %existing.email,
            "Superadmin already exists"
        );
        return Ok(Outcome::AlreadyExists {
            username: existing.username,
            email: existing.email,
        });
    }

    info!(username = %username, "Creating default superadmin user");

    let digest = hash_password_blocking(password.clone(), security.clone()).await?;
    let account = NewAccount::new(
        username.to_string(),
        Role::Superadmin,
        email.to_string(),
        digest,
    );

    match store.insert_account(&account).await {
        Ok(InsertOutcome::Inserted(id)) => {
            info!(id = %id, username = %account.username, email = %account.email, "Superadmin created");
            if default_used {
                warn!("Superadmin was created with the built-in default password; change it before production use");
            }
            Ok(Outcome::Created {
                id,
                username: account.username,
                email: account.email,
                default_password: default_used.then_some(password),
            })
        }
        Ok(InsertOutcome::Duplicate) => {
            let winner = store
                .find_by_role(Role::Superadmin)
                .await
                .map_err(unreachable)?
                .ok_or_else(|| {
                    BootstrapError::WriteFailure(
                        "insert rejected as duplicate but no superadmin is visible".to_string(),
                    )
                })?;

            warn!(
                username = %winner.username,
                "Superadmin was created concurrently by another process"
            );
            Ok(Outcome::AlreadyExists {
                username: winner.username,
                email: winner.email,
            })
        }
        Err(e) => Err(BootstrapError::WriteFailure(e.to_string())),
    }
}

/// Startup wrapper: runs the bootstrap, logs and counts the result, never fails.
pub async fn bootstrap_on_startup<S>(
    store: &S,
    config: &BootstrapConfig,
    security: &SecurityConfig,
) -> Option<Outcome>
where
    S: AccountStore + ?Sized,
{
    let seed = SuperadminSeed::from_config(config);

    match ensure_privileged_account(store, &seed, security).await {
        Ok(outcome) => {
            metrics::counter!("valids_bootstrap_total", "outcome" => outcome.label()).increment(1);
            Some(outcome)
        }
        Err(e) => {
            metrics::counter!("valids_bootstrap_total", "outcome" => e.label()).increment(1);
            error!("Error ensuring superuser: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Account;
    use crate::services::password::{PasswordScheme, sha256_hex, verify_password};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory account store with switchable failures.
    #[derive(Default)]
    struct FakeStore {
        accounts: Mutex<Vec<Account>>,
        unreachable: AtomicBool,
        fail_writes: AtomicBool,
        /// Hide existing superadmins from the first role lookup.
        hide_first_lookup: AtomicBool,
        inserts: AtomicUsize,
    }

    impl FakeStore {
        fn with_account(account: Account) -> Self {
            let store = Self::default();
            store.accounts.lock().unwrap().push(account);
            store
        }

        fn superadmins(&self) -> Vec<Account> {
            self.accounts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.role == Role::Superadmin)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl AccountStore for FakeStore {
        async fn ping(&self) -> Result<(), StoreError> {
            if self.unreachable.load(Ordering::SeqCst) {
                return Err(StoreError::Unreachable("connection refused".to_string()));
            }
            Ok(())
        }

        async fn find_by_role(&self, role: Role) -> Result<Option<Account>, StoreError> {
            if self.hide_first_lookup.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.role == role)
                .cloned())
        }

        async fn find_by_username_or_email(
            &self,
            username: &str,
            email: &str,
        ) -> Result<Option<Account>, StoreError> {
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.username == username || a.email == email)
                .cloned())
        }

        async fn get_account(&self, id: &str) -> Result<Option<Account>, StoreError> {
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id == id)
                .cloned())
        }

        async fn insert_account(
            &self,
            account: &NewAccount,
        ) -> Result<InsertOutcome, StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Write("disk quota exceeded".to_string()));
            }
            let mut accounts = self.accounts.lock().unwrap();
            if account.role == Role::Superadmin
                && accounts.iter().any(|a| a.role == Role::Superadmin)
            {
                return Ok(InsertOutcome::Duplicate);
            }
            self.inserts.fetch_add(1, Ordering::SeqCst);
            let id = format!("{}", accounts.len() + 1);
            accounts.push(Account {
                id: id.clone(),
                username: account.username.clone(),
                role: account.role,
                email: account.email.clone(),
                password_digest: account.password_digest.clone(),
                company_id: account.company_id.clone(),
                experience_years: account.experience_years,
                is_active: account.is_active,
                created_at: account.created_at,
                updated_at: account.updated_at,
            });
            Ok(InsertOutcome::Inserted(id))
        }

        async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
            Ok(self.accounts.lock().unwrap().clone())
        }
    }

    fn fast_security() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    fn existing_superadmin() -> Account {
        Account {
            id: "42".to_string(),
            username: "root".to_string(),
            role: Role::Superadmin,
            email: "ops@example.org".to_string(),
            password_digest: "legacy-digest".to_string(),
            company_id: Some("507f1f77bcf86cd799439011".to_string()),
            experience_years: Some(12),
            is_active: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn creates_default_superadmin_on_empty_store() {
        let store = FakeStore::default();
        let outcome =
            ensure_privileged_account(&store, &SuperadminSeed::default(), &fast_security())
                .await
                .unwrap();

        let Outcome::Created {
            username,
            email,
            default_password,
            ..
        } = &outcome
        else {
            panic!("expected Created, got {outcome:?}");
        };
        assert_eq!(username, "superadmin");
        assert_eq!(email, "admin@valids.com");
        assert_eq!(default_password.as_deref(), Some("admin123"));

        let created = store.superadmins();
        assert_eq!(created.len(), 1);
        let account = &created[0];
        assert_eq!(account.role, Role::Superadmin);
        assert!(account.is_active);
        assert!(account.company_id.is_none());
        assert!(account.experience_years.is_none());
        assert_eq!(account.created_at, account.updated_at);
        assert_ne!(account.password_digest, "admin123");
        assert!(verify_password("admin123", &account.password_digest));
    }

    #[tokio::test]
    async fn sha256_scheme_stores_legacy_digest() {
        let store = FakeStore::default();
        let security = SecurityConfig {
            password_scheme: PasswordScheme::Sha256,
            ..SecurityConfig::default()
        };

        ensure_privileged_account(&store, &SuperadminSeed::default(), &security)
            .await
            .unwrap();

        assert_eq!(store.superadmins()[0].password_digest, sha256_hex("admin123"));
    }

    #[tokio::test]
    async fn second_run_reports_existing_identity() {
        let store = FakeStore::default();
        let seed = SuperadminSeed::default();

        let first = ensure_privileged_account(&store, &seed, &fast_security())
            .await
            .unwrap();
        let second = ensure_privileged_account(&store, &seed, &fast_security())
            .await
            .unwrap();

        assert!(first.is_created());
        assert_eq!(
            second,
            Outcome::AlreadyExists {
                username: "superadmin".to_string(),
                email: "admin@valids.com".to_string(),
            }
        );
        assert_eq!(store.superadmins().len(), 1);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn existing_superadmin_is_not_modified() {
        let before = existing_superadmin();
        let store = FakeStore::with_account(before.clone());

        let outcome =
            ensure_privileged_account(&store, &SuperadminSeed::default(), &fast_security())
                .await
                .unwrap();

        assert_eq!(outcome.username(), "root");
        assert_eq!(outcome.email(), "ops@example.org");
        assert_eq!(store.superadmins(), vec![before]);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_store_is_reported_without_insert() {
        let store = FakeStore::default();
        store.unreachable.store(true, Ordering::SeqCst);

        let err = ensure_privileged_account(&store, &SuperadminSeed::default(), &fast_security())
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::StoreUnreachable(_)));
        assert!(store.accounts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_insert_is_a_write_failure() {
        let store = FakeStore::default();
        store.fail_writes.store(true, Ordering::SeqCst);

        let err = ensure_privileged_account(&store, &SuperadminSeed::default(), &fast_security())
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::WriteFailure(msg) if msg.contains("quota")));
    }

    #[tokio::test]
    async fn lost_race_reports_the_winner() {
        let winner = existing_superadmin();
        let store = FakeStore::with_account(winner.clone());
        store.hide_first_lookup.store(true, Ordering::SeqCst);

        let outcome =
            ensure_privileged_account(&store, &SuperadminSeed::default(), &fast_security())
                .await
                .unwrap();

        assert_eq!(
            outcome,
            Outcome::AlreadyExists {
                username: winner.username,
                email: winner.email,
            }
        );
        assert_eq!(store.superadmins().len(), 1);
    }

    #[tokio::test]
    async fn explicit_password_required_when_configured() {
        let store = FakeStore::default();
        let seed = SuperadminSeed {
            require_explicit_password: true,
            ..SuperadminSeed::default()
        };

        let err = ensure_privileged_account(&store, &seed, &fast_security())
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::MissingPassword));
        assert!(store.accounts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_configured_password_counts_as_missing() {
        let store = FakeStore::default();
        let seed = SuperadminSeed {
            password: Some("   ".to_string()),
            require_explicit_password: true,
            ..SuperadminSeed::default()
        };

        let err = ensure_privileged_account(&store, &seed, &fast_security())
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::MissingPassword));
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_configured_password_falls_back_to_default() {
        let store = FakeStore::default();
        let seed = SuperadminSeed {
            password: Some(String::new()),
            ..SuperadminSeed::default()
        };

        let outcome = ensure_privileged_account(&store, &seed, &fast_security())
            .await
            .unwrap();

        assert!(matches!(
            &outcome,
            Outcome::Created { default_password: Some(p), .. } if p == DEFAULT_PASSWORD
        ));
        let account = &store.superadmins()[0];
        assert!(!verify_password("", &account.password_digest));
    }

    #[tokio::test]
    async fn malformed_seed_is_rejected_before_store_access() {
        let store = FakeStore::default();
        store.unreachable.store(true, Ordering::SeqCst);

        for seed in [
            SuperadminSeed {
                email: "not-an-email".to_string(),
                ..SuperadminSeed::default()
            },
            SuperadminSeed {
                username: "ab".to_string(),
                ..SuperadminSeed::default()
            },
            SuperadminSeed {
                password: Some("short".to_string()),
                ..SuperadminSeed::default()
            },
        ] {
            let err = ensure_privileged_account(&store, &seed, &fast_security())
                .await
                .unwrap_err();
            assert!(matches!(err, BootstrapError::InvalidSeed(_)), "{err}");
        }
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn seed_credentials_are_trimmed() {
        let store = FakeStore::default();
        let seed = SuperadminSeed {
            username: "  owner ".to_string(),
            email: " owner@example.com".to_string(),
            ..SuperadminSeed::default()
        };

        ensure_privileged_account(&store, &seed, &fast_security())
            .await
            .unwrap();

        let account = &store.superadmins()[0];
        assert_eq!(account.username, "owner");
        assert_eq!(account.email, "owner@example.com");
    }

    #[tokio::test]
    async fn configured_password_is_not_echoed() {
        let store = FakeStore::default();
        let seed = SuperadminSeed {
            username: "owner".to_string(),
            email: "owner@example.com".to_string(),
            password: Some("correct horse battery".to_string()),
            require_explicit_password: true,
        };

        let outcome = ensure_privileged_account(&store, &seed, &fast_security())
            .await
            .unwrap();

        assert!(matches!(
            &outcome,
            Outcome::Created { default_password: None, username, .. } if username == "owner"
        ));
        let account = &store.superadmins()[0];
        assert!(verify_password("correct horse battery", &account.password_digest));
        assert!(!verify_password("admin123", &account.password_digest));
    }

    #[tokio::test]
    async fn startup_wrapper_swallows_errors() {
        let store = FakeStore::default();
        store.unreachable.store(true, Ordering::SeqCst);

        let outcome =
            bootstrap_on_startup(&store, &BootstrapConfig::default(), &fast_security()).await;
        assert!(outcome.is_none());
    }

    #[test]
    fn outcome_serialization_omits_password() {
        let outcome = Outcome::Created {
            id: "1".to_string(),
            username: "superadmin".to_string(),
            email: "admin@valids.com".to_string(),
            default_password: Some("admin123".to_string()),
        };
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["outcome"], "created");
        assert_eq!(json["username"], "superadmin");
        assert!(json.get("default_password").is_none());
    }
}
