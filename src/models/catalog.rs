//! Compliance catalog records used by the sample data seed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewField {
    pub field_name: String,
    pub field_type: String,
    pub is_required: bool,
    pub options: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub description: String,
    pub fields_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewControl {
    pub control_name: String,
    pub control_key: String,
    pub question_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIsoStandard {
    pub iso_name: String,
    pub iso_description: Option<String>,
    pub control_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored ISO standard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IsoStandard {
    pub id: String,
    pub iso_name: String,
    pub iso_description: Option<String>,
    pub control_id: String,
    pub is_active: bool,
}
