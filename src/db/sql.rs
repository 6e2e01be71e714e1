use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use super::repositories::account::AccountRepository;
use super::repositories::catalog::CatalogRepository;
use super::{AccountStore, CatalogStore, InsertOutcome, StoreError};
use crate::models::catalog::{IsoStandard, NewControl, NewField, NewIsoStandard, NewQuestion};
use crate::models::{Account, NewAccount, Role};

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqlStore {
    pub conn: DatabaseConnection,
}

impl SqlStore {
    pub async fn new(db_url: &str) -> Result<Self, StoreError> {
        Self::with_pool_options(db_url, 5, 1, 10).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
        connect_timeout_seconds: u64,
    ) -> Result<Self, StoreError> {
        use sea_orm_migration::MigratorTrait;

        if let Some(path_str) = file_path(db_url) {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str).map_err(|e| {
                    StoreError::Unreachable(format!("cannot create database file {path_str}: {e}"))
                })?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout_seconds))
            .acquire_timeout(Duration::from_secs(connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt)
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        super::migrator::Migrator::up(&conn, None)
            .await
            .map_err(|e| StoreError::Write(format!("migrations failed: {e}")))?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn close(self) {
        if let Err(e) = self.conn.close().await {
            warn!("Failed to close database connection: {}", e);
        }
    }

    fn account_repo(&self) -> AccountRepository {
        AccountRepository::new(self.conn.clone())
    }

    fn catalog_repo(&self) -> CatalogRepository {
        CatalogRepository::new(self.conn.clone())
    }
}

/// On-disk path for file-backed SQLite urls, `None` for in-memory databases.
fn file_path(db_url: &str) -> Option<&str> {
    let path = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
    let path = path.split('?').next().unwrap_or(path);

    if path.is_empty() || path == ":memory:" || db_url.contains("mode=memory") {
        None
    } else {
        Some(path)
    }
}

/// Maps a SeaORM error, treating connection failures as an unreachable store.
pub(crate) fn classify(err: DbErr, fallback: fn(String) -> StoreError) -> StoreError {
    match err {
        DbErr::Conn(e) => StoreError::Unreachable(e.to_string()),
        DbErr::ConnectionAcquire(e) => StoreError::Unreachable(e.to_string()),
        other => fallback(other.to_string()),
    }
}

#[async_trait]
impl AccountStore for SqlStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        Ok(())
    }

    async fn find_by_role(&self, role: Role) -> Result<Option<Account>, StoreError> {
        self.account_repo().find_by_role(role).await
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.account_repo()
            .find_by_username_or_email(username, email)
            .await
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>, StoreError> {
        self.account_repo().get(id).await
    }

    async fn insert_account(&self, account: &NewAccount) -> Result<InsertOutcome, StoreError> {
        self.account_repo().insert(account).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.account_repo().list().await
    }
}

#[async_trait]
impl CatalogStore for SqlStore {
    async fn find_iso_by_name(&self, name: &str) -> Result<Option<IsoStandard>, StoreError> {
        self.catalog_repo().find_iso_by_name(name).await
    }

    async fn insert_field(&self, field: &NewField) -> Result<String, StoreError> {
        self.catalog_repo().insert_field(field).await
    }

    async fn insert_question(&self, question: &NewQuestion) -> Result<String, StoreError> {
        self.catalog_repo().insert_question(question).await
    }

    async fn insert_control(&self, control: &NewControl) -> Result<String, StoreError> {
        self.catalog_repo().insert_control(control).await
    }

    async fn insert_iso_standard(&self, iso: &NewIsoStandard) -> Result<String, StoreError> {
        self.catalog_repo().insert_iso_standard(iso).await
    }
}
