//! Saved bulk operation templates.

use kartparts_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `bulk_operation_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BulkOperationTemplate {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub entity_type: String,
    pub operation_type: String,
    pub filter: serde_json::Value,
    pub changes: serde_json::Value,
    pub is_public: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for saving a template.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBulkOperationTemplate {
    pub name: String,
    pub description: Option<String>,
    pub entity_type: String,
    pub operation_type: String,
    pub filter: serde_json::Value,
    pub changes: serde_json::Value,
    pub is_public: bool,
    pub created_by: Option<DbId>,
}
