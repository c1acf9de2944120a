//! Direct engine-to-part fit mappings.

use kartparts_core::catalog::FitLevel;
use kartparts_core::error::CoreError;
use kartparts_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `engine_part_compatibility` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EnginePartCompatibility {
    pub id: DbId,
    pub engine_id: DbId,
    pub part_id: DbId,
    pub compatibility_level: String,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EnginePartCompatibility {
    pub fn fit_level(&self) -> Result<FitLevel, CoreError> {
        FitLevel::parse(&self.compatibility_level)
    }
}

/// A mapping joined with the part it points at.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EnginePartMapping {
    pub part_id: DbId,
    pub part_name: String,
    pub part_category: String,
    pub compatibility_level: String,
    pub notes: Option<String>,
}

/// DTO for creating or replacing the mapping of one engine/part pair.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertEnginePartCompatibility {
    pub engine_id: DbId,
    pub part_id: DbId,
    pub compatibility_level: String,
    pub notes: Option<String>,
}
