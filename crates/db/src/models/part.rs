//! Part catalog rows.

use kartparts_core::compatibility::Subject;
use kartparts_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;

/// A row from the `parts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Part {
    pub id: DbId,
    pub slug: String,
    pub name: String,
    pub category: String,
    pub brand: Option<String>,
    pub specifications: serde_json::Value,
    pub price: Option<f64>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Part {
    /// Evaluation subject exposing the columns compatibility rules may read.
    pub fn subject(&self) -> Subject {
        Subject::new(
            &self.name,
            &self.category,
            json!({
                "name": self.name,
                "brand": self.brand,
                "category": self.category,
                "price": self.price,
                "specifications": self.specifications,
            }),
        )
    }
}

/// DTO for inserting a part.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePart {
    pub slug: String,
    pub name: String,
    pub category: String,
    pub brand: Option<String>,
    pub specifications: Option<serde_json::Value>,
    pub price: Option<f64>,
}
