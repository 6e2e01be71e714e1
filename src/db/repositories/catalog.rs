use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, Set};

use crate::db::StoreError;
use crate::db::sql::classify;
use crate::entities::{controls, fields, iso_standards, questions};
use crate::models::catalog::{IsoStandard, NewControl, NewField, NewIsoStandard, NewQuestion};

pub struct CatalogRepository {
    conn: DatabaseConnection,
}

impl CatalogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_iso_by_name(&self, name: &str) -> Result<Option<IsoStandard>, StoreError> {
        let iso = iso_standards::Entity::find()
            .filter(iso_standards::Column::IsoName.eq(name))
            .one(&self.conn)
            .await
            .map_err(|e| classify(e, StoreError::Query))?;

        Ok(iso.map(|m| IsoStandard {
            id: m.id.to_string(),
            iso_name: m.iso_name,
            iso_description: m.iso_description,
            control_id: m.control_id,
            is_active: m.is_active,
        }))
    }

    pub async fn insert_field(&self, field: &NewField) -> Result<String, StoreError> {
        let options = serde_json::to_string(&field.options)
            .map_err(|e| StoreError::Write(format!("cannot encode field options: {e}")))?;

        let model = fields::ActiveModel {
            id: NotSet,
            field_name: Set(field.field_name.clone()),
            field_type: Set(field.field_type.clone()),
            is_required: Set(field.is_required),
            options: Set(options),
            is_active: Set(field.is_active),
            created_at: Set(field.created_at.to_rfc3339()),
            updated_at: Set(field.updated_at.to_rfc3339()),
        }
        .insert(&self.conn)
        .await
        .map_err(|e| classify(e, StoreError::Write))?;

        Ok(model.id.to_string())
    }

    pub async fn insert_question(&self, question: &NewQuestion) -> Result<String, StoreError> {
        let model = questions::ActiveModel {
            id: NotSet,
            description: Set(question.description.clone()),
            fields_id: Set(question.fields_id.clone()),
            is_active: Set(question.is_active),
            created_at: Set(question.created_at.to_rfc3339()),
            updated_at: Set(question.updated_at.to_rfc3339()),
        }
        .insert(&self.conn)
        .await
        .map_err(|e| classify(e, StoreError::Write))?;

        Ok(model.id.to_string())
    }

    pub async fn insert_control(&self, control: &NewControl) -> Result<String, StoreError> {
        let model = controls::ActiveModel {
            id: NotSet,
            control_name: Set(control.control_name.clone()),
            control_key: Set(control.control_key.clone()),
            question_id: Set(control.question_id.clone()),
            is_active: Set(control.is_active),
            created_at: Set(control.created_at.to_rfc3339()),
            updated_at: Set(control.updated_at.to_rfc3339()),
        }
        .insert(&self.conn)
        .await
        .map_err(|e| classify(e, StoreError::Write))?;

        Ok(model.id.to_string())
    }

    pub async fn insert_iso_standard(&self, iso: &NewIsoStandard) -> Result<String, StoreError> {
        let model = iso_standards::ActiveModel {
            id: NotSet,
            iso_name: Set(iso.iso_name.clone()),
            iso_description: Set(iso.iso_description.clone()),
            control_id: Set(iso.control_id.clone()),
            is_active: Set(iso.is_active),
            created_at: Set(iso.created_at.to_rfc3339()),
            updated_at: Set(iso.updated_at.to_rfc3339()),
        }
        .insert(&self.conn)
        .await
        .map_err(|e| classify(e, StoreError::Write))?;

        Ok(model.id.to_string())
    }
}
