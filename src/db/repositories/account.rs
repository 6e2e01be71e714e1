use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use tracing::warn;

use crate::db::sql::classify;
use crate::db::{InsertOutcome, StoreError};
use crate::entities::users;
use crate::models::{Account, NewAccount, Role};

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_role(&self, role: Role) -> Result<Option<Account>, StoreError> {
        let user = users::Entity::find()
            .filter(users::Column::Roletype.eq(role.as_str()))
            .order_by_asc(users::Column::Id)
            .one(&self.conn)
            .await
            .map_err(|e| classify(e, StoreError::Query))?;

        user.map(Account::try_from).transpose()
    }

    pub async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        let user = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(username))
                    .add(users::Column::Email.eq(email)),
            )
            .order_by_asc(users::Column::Id)
            .one(&self.conn)
            .await
            .map_err(|e| classify(e, StoreError::Query))?;

        user.map(Account::try_from).transpose()
    }

    /// Ids that are not integers cannot exist in this table.
    pub async fn get(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let Ok(id) = id.parse::<i32>() else {
            return Ok(None);
        };

        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(|e| classify(e, StoreError::Query))?;

        user.map(Account::try_from).transpose()
    }

    pub async fn insert(&self, account: &NewAccount) -> Result<InsertOutcome, StoreError> {
        let active = users::ActiveModel {
            id: NotSet,
            username: Set(account.username.clone()),
            roletype: Set(account.role.as_str().to_string()),
            email: Set(account.email.clone()),
            password: Set(account.password_digest.clone()),
            company_id: Set(account.company_id.clone()),
            experience_years: Set(account.experience_years),
            is_active: Set(account.is_active),
            created_at: Set(account.created_at.to_rfc3339()),
            updated_at: Set(account.updated_at.to_rfc3339()),
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(InsertOutcome::Inserted(model.id.to_string())),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Ok(InsertOutcome::Duplicate),
                _ => Err(classify(e, StoreError::Write)),
            },
        }
    }

    /// Rows with an unrecognised role are skipped.
    pub async fn list(&self) -> Result<Vec<Account>, StoreError> {
        let rows = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .map_err(|e| classify(e, StoreError::Query))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                Account::try_from(row)
                    .map_err(|e| warn!("Skipping user {}: {}", id, e))
                    .ok()
            })
            .collect())
    }
}

impl TryFrom<users::Model> for Account {
    type Error = StoreError;

    fn try_from(model: users::Model) -> Result<Self, Self::Error> {
        let role = model.roletype.parse::<Role>().map_err(StoreError::Query)?;

        Ok(Self {
            id: model.id.to_string(),
            username: model.username,
            role,
            email: model.email,
            password_digest: model.password,
            company_id: model.company_id,
            experience_years: model.experience_years,
            is_active: model.is_active,
            created_at: parse_timestamp(&model.created_at)?,
            updated_at: parse_timestamp(&model.updated_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("invalid timestamp {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlStore;

    async fn repo() -> AccountRepository {
        let store = SqlStore::with_pool_options("sqlite::memory:", 1, 1, 5)
            .await
            .expect("in-memory store");
        AccountRepository::new(store.conn)
    }

    fn account(username: &str, role: Role) -> NewAccount {
        NewAccount::new(
            username.to_string(),
            role,
            format!("{username}@example.com"),
            "digest".to_string(),
        )
    }

    #[tokio::test]
    async fn insert_and_find_by_role() {
        let repo = repo().await;
        assert!(repo.find_by_role(Role::Superadmin).await.unwrap().is_none());

        let outcome = repo.insert(&account("root", Role::Superadmin)).await.unwrap();
        let InsertOutcome::Inserted(id) = outcome else {
            panic!("expected insert, got {outcome:?}");
        };

        let found = repo.find_by_role(Role::Superadmin).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.username, "root");
        assert_eq!(found.role, Role::Superadmin);
        assert!(found.company_id.is_none());
    }

    #[tokio::test]
    async fn second_superadmin_is_rejected_by_index() {
        let repo = repo().await;
        repo.insert(&account("first", Role::Superadmin)).await.unwrap();

        let outcome = repo.insert(&account("second", Role::Superadmin)).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Duplicate);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn other_roles_are_not_unique() {
        let repo = repo().await;
        repo.insert(&account("a1", Role::Auditor)).await.unwrap();
        repo.insert(&account("a2", Role::Auditor)).await.unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|a| a.role == Role::Auditor));
    }

    #[tokio::test]
    async fn lookup_by_username_or_email() {
        let repo = repo().await;
        repo.insert(&account("jane", Role::Employee)).await.unwrap();

        let by_name = repo
            .find_by_username_or_email("jane", "other@example.com")
            .await
            .unwrap();
        assert!(by_name.is_some());

        let by_email = repo
            .find_by_username_or_email("someone", "jane@example.com")
            .await
            .unwrap();
        assert!(by_email.is_some());

        let neither = repo
            .find_by_username_or_email("someone", "else@example.com")
            .await
            .unwrap();
        assert!(neither.is_none());
    }

    #[tokio::test]
    async fn non_numeric_id_is_absent() {
        let repo = repo().await;
        assert!(repo.get("507f1f77bcf86cd799439011").await.unwrap().is_none());
    }
}
