//! Sample compliance catalog for fresh environments.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::db::{CatalogStore, StoreError};
use crate::models::catalog::{NewControl, NewField, NewIsoStandard, NewQuestion};

pub const SAMPLE_ISO_NAME: &str = "ISO 27001";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeedOutcome {
    Seeded {
        field_id: String,
        question_id: String,
        control_id: String,
        iso_id: String,
    },
    AlreadyPresent,
}

/// Inserts one field, question, control and ISO standard, each pointing at the
/// previous one. Skipped entirely when the sample ISO standard already exists.
pub async fn seed_sample_catalog<S>(store: &S) -> Result<SeedOutcome, StoreError>
where
    S: CatalogStore + ?Sized,
{
    if store.find_iso_by_name(SAMPLE_ISO_NAME).await?.is_some() {
        info!("Sample data already exists, skipping");
        return Ok(SeedOutcome::AlreadyPresent);
    }

    info!("Creating sample data");
    let now = Utc::now();

    let field = NewField {
        field_name: "Security Level".to_string(),
        field_type: "select".to_string(),
        is_required: true,
        options: ["Low", "Medium", "High", "Critical"]
            .into_iter()
            .map(String::from)
            .collect(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let field_id = store.insert_field(&field).await?;
    info!(id = %field_id, "Created sample field: {}", field.field_name);

    let question = NewQuestion {
        description: "What is the current security level of your organization?".to_string(),
        fields_id: field_id.clone(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let question_id = store.insert_question(&question).await?;
    info!(id = %question_id, "Created sample question");

    let control = NewControl {
        control_name: "Access Control Management".to_string(),
        control_key: "AC-01".to_string(),
        question_id: question_id.clone(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let control_id = store.insert_control(&control).await?;
    info!(id = %control_id, "Created sample control: {}", control.control_name);

    let iso = NewIsoStandard {
        iso_name: SAMPLE_ISO_NAME.to_string(),
        iso_description: Some("Information Security Management System".to_string()),
        control_id: control_id.clone(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let iso_id = store.insert_iso_standard(&iso).await?;
    info!(id = %iso_id, "Created sample ISO: {}", iso.iso_name);

    Ok(SeedOutcome::Seeded {
        field_id,
        question_id,
        control_id,
        iso_id,
    })
}
