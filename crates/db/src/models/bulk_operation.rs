//! Bulk operation models and DTOs.
//!
//! Maps to the `bulk_operations` table. `filter`, `changes`, `snapshot` and
//! `error_log` are JSONB; their typed forms live in `kartparts_core::bulk`.

use kartparts_core::bulk::{
    BulkEntityType, BulkFilter, BulkOperationStatus, BulkOperationType, SnapshotEntry,
};
use kartparts_core::error::CoreError;
use kartparts_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `bulk_operations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BulkOperation {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub entity_type: String,
    pub operation_type: String,
    pub filter: serde_json::Value,
    pub changes: serde_json::Value,
    pub affected_ids: Vec<DbId>,
    pub affected_count: i32,
    pub completed_count: i32,
    pub failed_count: i32,
    pub error_log: serde_json::Value,
    /// Prior row state captured at execution. Omitted from API responses.
    #[serde(skip_serializing)]
    pub snapshot: Option<serde_json::Value>,
    pub status: String,
    pub scheduled_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub undone_at: Option<Timestamp>,
    pub can_undo: bool,
    pub expires_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BulkOperation {
    pub fn entity(&self) -> Result<BulkEntityType, CoreError> {
        BulkEntityType::parse(&self.entity_type)
    }

    pub fn op_type(&self) -> Result<BulkOperationType, CoreError> {
        BulkOperationType::parse(&self.operation_type)
    }

    pub fn status(&self) -> Result<BulkOperationStatus, CoreError> {
        BulkOperationStatus::parse(&self.status)
    }

    pub fn bulk_filter(&self) -> Result<BulkFilter, CoreError> {
        serde_json::from_value(self.filter.clone())
            .map_err(|e| CoreError::Internal(format!("Stored filter is malformed: {e}")))
    }

    pub fn change_map(&self) -> Result<serde_json::Map<String, serde_json::Value>, CoreError> {
        match &self.changes {
            serde_json::Value::Object(map) => Ok(map.clone()),
            _ => Err(CoreError::Internal(
                "Stored changes are not an object".to_string(),
            )),
        }
    }

    /// Decoded snapshot entries, or `None` if nothing was captured.
    pub fn snapshot_entries(&self) -> Result<Option<Vec<SnapshotEntry>>, CoreError> {
        self.snapshot
            .as_ref()
            .filter(|v| !v.is_null())
            .map(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| CoreError::Internal(format!("Stored snapshot is malformed: {e}")))
            })
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for inserting a new (pending) bulk operation.
#[derive(Debug, Clone)]
pub struct CreateBulkOperation {
    pub name: String,
    pub description: Option<String>,
    pub entity_type: BulkEntityType,
    pub operation_type: BulkOperationType,
    pub filter: serde_json::Value,
    pub changes: serde_json::Value,
    pub affected_count: i32,
    pub scheduled_at: Option<Timestamp>,
    pub expires_at: Timestamp,
    pub created_by: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Query params
// ---------------------------------------------------------------------------

/// Optional criteria for listing operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkOperationListFilter {
    pub status: Option<String>,
    pub entity_type: Option<String>,
}
