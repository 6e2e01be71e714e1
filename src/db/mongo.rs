use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

use super::{AccountStore, CatalogStore, InsertOutcome, StoreError};
use crate::config::DatabaseConfig;
use crate::models::catalog::{IsoStandard, NewControl, NewField, NewIsoStandard, NewQuestion};
use crate::models::{Account, NewAccount, Role};

const USERS: &str = "users";
const FIELDS: &str = "fields";
const QUESTIONS: &str = "questions";
const CONTROLS: &str = "controls";
const ISO: &str = "iso";

const DUPLICATE_KEY: i32 = 11000;

/// Layout of a document in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    username: String,
    roletype: String,
    email: String,
    password: String,
    #[serde(default)]
    company_id: Option<String>,
    #[serde(default)]
    experience_years: Option<i32>,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    created_at: Option<bson::DateTime>,
    #[serde(default)]
    updated_at: Option<bson::DateTime>,
}

#[derive(Debug, Clone, Deserialize)]
struct IsoDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    iso_name: String,
    #[serde(default)]
    iso_description: Option<String>,
    #[serde(default)]
    control_id: String,
    #[serde(default = "default_true")]
    is_active: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
    /// Set once the superadmin index is known to exist. Shared across clones.
    indexed: Arc<AtomicBool>,
}

impl MongoStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        info!("Connecting to MongoDB at {}", redact(&config.url));

        let store = Self::open(config).await?;
        store.ping().await?;
        info!("Successfully connected to MongoDB database: {}", config.name);

        Ok(store)
    }

    /// Builds the client without contacting a server. Indexes are created
    /// on the first successful ping.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let timeout = Duration::from_secs(config.connect_timeout_seconds);

        let mut options = ClientOptions::parse(config.url.as_str())
            .await
            .map_err(|e| StoreError::Unreachable(format!("invalid MongoDB url: {e}")))?;
        options.app_name = Some("valids".to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);
        options.max_pool_size = Some(config.max_connections);
        options.min_pool_size = Some(config.min_connections);

        let client =
            Client::with_options(options).map_err(|e| classify(e, StoreError::Unreachable))?;
        let db = client.database(&config.name);

        Ok(Self {
            client,
            db,
            indexed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Partial unique index: at most one document with the superadmin role.
    async fn ensure_indexes(&self) -> bool {
        let options = IndexOptions::builder()
            .name("uniq_superadmin_roletype".to_string())
            .unique(true)
            .partial_filter_expression(doc! { "roletype": Role::Superadmin.as_str() })
            .build();
        let index = IndexModel::builder()
            .keys(doc! { "roletype": 1 })
            .options(options)
            .build();

        match self.users().create_index(index).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    "Could not create superadmin uniqueness index, bootstrap falls back to check-then-insert: {}",
                    e
                );
                false
            }
        }
    }

    pub async fn close(self) {
        self.client.shutdown().await;
        info!("MongoDB connection closed");
    }

    fn users(&self) -> Collection<UserDocument> {
        self.db.collection(USERS)
    }

    fn documents(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    async fn insert_document(&self, collection: &str, document: Document) -> Result<String, StoreError> {
        let result = self
            .documents(collection)
            .insert_one(document)
            .await
            .map_err(|e| classify(e, StoreError::Write))?;

        Ok(inserted_id(&result.inserted_id))
    }
}

#[async_trait]
impl AccountStore for MongoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        if !self.indexed.load(Ordering::Acquire) && self.ensure_indexes().await {
            self.indexed.store(true, Ordering::Release);
        }
        Ok(())
    }

    async fn find_by_role(&self, role: Role) -> Result<Option<Account>, StoreError> {
        let user = self
            .users()
            .find_one(doc! { "roletype": role.as_str() })
            .sort(doc! { "_id": 1 })
            .await
            .map_err(|e| classify(e, StoreError::Query))?;

        user.map(Account::try_from).transpose()
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        let user = self
            .users()
            .find_one(doc! { "$or": [ { "username": username }, { "email": email } ] })
            .await
            .map_err(|e| classify(e, StoreError::Query))?;

        user.map(Account::try_from).transpose()
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };

        let user = self
            .users()
            .find_one(doc! { "_id": oid })
            .await
            .map_err(|e| classify(e, StoreError::Query))?;

        user.map(Account::try_from).transpose()
    }

    async fn insert_account(&self, account: &NewAccount) -> Result<InsertOutcome, StoreError> {
        let document = UserDocument::from(account);

        match self.users().insert_one(&document).await {
            Ok(result) => Ok(InsertOutcome::Inserted(inserted_id(&result.inserted_id))),
            Err(e) if is_duplicate_key(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(classify(e, StoreError::Write)),
        }
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let documents: Vec<UserDocument> = self
            .users()
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await
            .map_err(|e| classify(e, StoreError::Query))?
            .try_collect()
            .await
            .map_err(|e| classify(e, StoreError::Query))?;

        Ok(documents
            .into_iter()
            .filter_map(|document| {
                let id = document.id;
                Account::try_from(document)
                    .map_err(|e| warn!("Skipping user {:?}: {}", id, e))
                    .ok()
            })
            .collect())
    }
}

#[async_trait]
impl CatalogStore for MongoStore {
    async fn find_iso_by_name(&self, name: &str) -> Result<Option<IsoStandard>, StoreError> {
        let iso = self
            .db
            .collection::<IsoDocument>(ISO)
            .find_one(doc! { "iso_name": name })
            .await
            .map_err(|e| classify(e, StoreError::Query))?;

        Ok(iso.map(|d| IsoStandard {
            id: d.id.to_hex(),
            iso_name: d.iso_name,
            iso_description: d.iso_description,
            control_id: d.control_id,
            is_active: d.is_active,
        }))
    }

    async fn insert_field(&self, field: &NewField) -> Result<String, StoreError> {
        // fieldType / isRequired are camelCase in the fields collection
        let document = doc! {
            "field_name": field.field_name.as_str(),
            "fieldType": field.field_type.as_str(),
            "isRequired": field.is_required,
            "options": field.options.clone(),
            "is_active": field.is_active,
            "created_at": to_bson_time(field.created_at),
            "updated_at": to_bson_time(field.updated_at),
        };
        self.insert_document(FIELDS, document).await
    }

    async fn insert_question(&self, question: &NewQuestion) -> Result<String, StoreError> {
        let document = doc! {
            "description": question.description.as_str(),
            "fields_id": question.fields_id.as_str(),
            "is_active": question.is_active,
            "created_at": to_bson_time(question.created_at),
            "updated_at": to_bson_time(question.updated_at),
        };
        self.insert_document(QUESTIONS, document).await
    }

    async fn insert_control(&self, control: &NewControl) -> Result<String, StoreError> {
        let document = doc! {
            "control_name": control.control_name.as_str(),
            "control_key": control.control_key.as_str(),
            "question_id": control.question_id.as_str(),
            "is_active": control.is_active,
            "created_at": to_bson_time(control.created_at),
            "updated_at": to_bson_time(control.updated_at),
        };
        self.insert_document(CONTROLS, document).await
    }

    async fn insert_iso_standard(&self, iso: &NewIsoStandard) -> Result<String, StoreError> {
        let document = doc! {
            "iso_name": iso.iso_name.as_str(),
            "iso_description": iso.iso_description.clone(),
            "control_id": iso.control_id.as_str(),
            "is_active": iso.is_active,
            "created_at": to_bson_time(iso.created_at),
            "updated_at": to_bson_time(iso.updated_at),
        };
        self.insert_document(ISO, document).await
    }
}

impl From<&NewAccount> for UserDocument {
    fn from(account: &NewAccount) -> Self {
        Self {
            id: None,
            username: account.username.clone(),
            roletype: account.role.as_str().to_string(),
            email: account.email.clone(),
            password: account.password_digest.clone(),
            company_id: account.company_id.clone(),
            experience_years: account.experience_years,
            is_active: account.is_active,
            created_at: Some(to_bson_time(account.created_at)),
            updated_at: Some(to_bson_time(account.updated_at)),
        }
    }
}

impl TryFrom<UserDocument> for Account {
    type Error = StoreError;

    fn try_from(document: UserDocument) -> Result<Self, Self::Error> {
        let role = document
            .roletype
            .parse::<Role>()
            .map_err(StoreError::Query)?;

        Ok(Self {
            id: document.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: document.username,
            role,
            email: document.email,
            password_digest: document.password,
            company_id: document.company_id,
            experience_years: document.experience_years,
            is_active: document.is_active,
            created_at: from_bson_time(document.created_at),
            updated_at: from_bson_time(document.updated_at),
        })
    }
}

fn to_bson_time(value: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(value.timestamp_millis())
}

fn from_bson_time(value: Option<bson::DateTime>) -> DateTime<Utc> {
    value
        .and_then(|dt| DateTime::from_timestamp_millis(dt.timestamp_millis()))
        .unwrap_or_default()
}

fn inserted_id(id: &Bson) -> String {
    id.as_object_id()
        .map_or_else(|| id.to_string(), |oid| oid.to_hex())
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

/// Connectivity failures map to `Unreachable` whatever the operation.
fn classify(err: MongoError, fallback: fn(String) -> StoreError) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
            StoreError::Unreachable(err.to_string())
        }
        _ => fallback(err.to_string()),
    }
}

/// Hides credentials embedded in a connection string.
pub(crate) fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
