//! Account and catalog persistence.
//!
//! Two backends sit behind the same traits: MongoDB (the deployed document
//! store) and SQLite through SeaORM. The backend is picked from the scheme of
//! `database.url`.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::models::catalog::{IsoStandard, NewControl, NewField, NewIsoStandard, NewQuestion};
use crate::models::{Account, NewAccount, Role};

pub mod migrator;
pub mod mongo;
pub mod repositories;
pub mod sql;

pub use mongo::MongoStore;
pub use sql::SqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("unsupported database url: {0}")]
    Unsupported(String),
}

/// Result of a single-document insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(String),

    /// Rejected by the single-superadmin uniqueness constraint.
    Duplicate,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Round-trips to the store.
    async fn ping(&self) -> Result<(), StoreError>;

    /// First account holding `role`, oldest first.
    async fn find_by_role(&self, role: Role) -> Result<Option<Account>, StoreError>;

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<Account>, StoreError>;

    async fn get_account(&self, id: &str) -> Result<Option<Account>, StoreError>;

    async fn insert_account(&self, account: &NewAccount) -> Result<InsertOutcome, StoreError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_iso_by_name(&self, name: &str) -> Result<Option<IsoStandard>, StoreError>;

    async fn insert_field(&self, field: &NewField) -> Result<String, StoreError>;

    async fn insert_question(&self, question: &NewQuestion) -> Result<String, StoreError>;

    async fn insert_control(&self, control: &NewControl) -> Result<String, StoreError>;

    async fn insert_iso_standard(&self, iso: &NewIsoStandard) -> Result<String, StoreError>;
}

#[derive(Clone)]
pub enum Store {
    Sql(SqlStore),
    Mongo(MongoStore),
}

impl Store {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config.url.trim();

        if is_mongo_url(url) {
            Ok(Self::Mongo(MongoStore::connect(config).await?))
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sql(
                SqlStore::with_pool_options(
                    url,
                    config.max_connections,
                    config.min_connections,
                    config.connect_timeout_seconds,
                )
                .await?,
            ))
        } else {
            Err(StoreError::Unsupported(url.to_string()))
        }
    }

    /// Like [`Store::connect`], but a MongoDB store is returned without
    /// waiting for a server; its operations fail until one is reachable.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if is_mongo_url(config.url.trim()) {
            Ok(Self::Mongo(MongoStore::open(config).await?))
        } else {
            Self::connect(config).await
        }
    }

    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Sql(_) => "sqlite",
            Self::Mongo(_) => "mongodb",
        }
    }

    /// Releases the underlying connections.
    pub async fn close(self) {
        match self {
            Self::Sql(store) => store.close().await,
            Self::Mongo(store) => store.close().await,
        }
    }
}

fn is_mongo_url(url: &str) -> bool {
    url.starts_with("mongodb://") || url.starts_with("mongodb+srv://")
}

#[async_trait]
impl AccountStore for Store {
    async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Self::Sql(s) => s.ping().await,
            Self::Mongo(s) => s.ping().await,
        }
    }

    async fn find_by_role(&self, role: Role) -> Result<Option<Account>, StoreError> {
        match self {
            Self::Sql(s) => s.find_by_role(role).await,
            Self::Mongo(s) => s.find_by_role(role).await,
        }
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        match self {
            Self::Sql(s) => s.find_by_username_or_email(username, email).await,
            Self::Mongo(s) => s.find_by_username_or_email(username, email).await,
        }
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>, StoreError> {
        match self {
            Self::Sql(s) => s.get_account(id).await,
            Self::Mongo(s) => s.get_account(id).await,
        }
    }

    async fn insert_account(&self, account: &NewAccount) -> Result<InsertOutcome, StoreError> {
        match self {
            Self::Sql(s) => s.insert_account(account).await,
            Self::Mongo(s) => s.insert_account(account).await,
        }
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        match self {
            Self::Sql(s) => s.list_accounts().await,
            Self::Mongo(s) => s.list_accounts().await,
        }
    }
}

#[async_trait]
impl CatalogStore for Store {
    async fn find_iso_by_name(&self, name: &str) -> Result<Option<IsoStandard>, StoreError> {
        match self {
            Self::Sql(s) => s.find_iso_by_name(name).await,
            Self::Mongo(s) => s.find_iso_by_name(name).await,
        }
    }

    async fn insert_field(&self, field: &NewField) -> Result<String, StoreError> {
        match self {
            Self::Sql(s) => s.insert_field(field).await,
            Self::Mongo(s) => s.insert_field(field).await,
        }
    }

    async fn insert_question(&self, question: &NewQuestion) -> Result<String, StoreError> {
        match self {
            Self::Sql(s) => s.insert_question(question).await,
            Self::Mongo(s) => s.insert_question(question).await,
        }
    }

    async fn insert_control(&self, control: &NewControl) -> Result<String, StoreError> {
        match self {
            Self::Sql(s) => s.insert_control(control).await,
            Self::Mongo(s) => s.insert_control(control).await,
        }
    }

    async fn insert_iso_standard(&self, iso: &NewIsoStandard) -> Result<String, StoreError> {
        match self {
            Self::Sql(s) => s.insert_iso_standard(iso).await,
            Self::Mongo(s) => s.insert_iso_standard(iso).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unknown_url_scheme() {
        let config = DatabaseConfig {
            url: "postgres://localhost/valids".to_string(),
            ..DatabaseConfig::default()
        };

        let err = Store::connect(&config).await.err().unwrap();
        assert!(matches!(err, StoreError::Unsupported(_)));
    }

    #[tokio::test]
    async fn open_does_not_wait_for_mongo() {
        let config = DatabaseConfig {
            url: "mongodb://127.0.0.1:1/?directConnection=true".to_string(),
            connect_timeout_seconds: 1,
            ..DatabaseConfig::default()
        };

        let store = Store::open(&config).await.unwrap();
        assert_eq!(store.backend_name(), "mongodb");
        assert!(matches!(
            store.ping().await,
            Err(StoreError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn sqlite_url_selects_sql_backend() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..DatabaseConfig::default()
        };

        let store = Store::connect(&config).await.unwrap();
        assert_eq!(store.backend_name(), "sqlite");
        assert!(store.ping().await.is_ok());
        store.close().await;
    }
}
