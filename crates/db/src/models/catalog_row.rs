//! Generic catalog row used by bulk previews.

use kartparts_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// An engine, part, or build row flattened to JSON.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CatalogRow {
    pub id: DbId,
    pub name: String,
    pub data: serde_json::Value,
}
