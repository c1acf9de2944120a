//! Engine catalog rows.

use kartparts_core::compatibility::Subject;
use kartparts_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;

/// A row from the `engines` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Engine {
    pub id: DbId,
    pub slug: String,
    pub name: String,
    pub brand: String,
    pub displacement_cc: i32,
    pub horsepower: f64,
    pub torque: f64,
    pub shaft_diameter: f64,
    pub shaft_length: f64,
    pub shaft_type: String,
    pub mount_type: String,
    pub weight_lbs: Option<f64>,
    pub price: Option<f64>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Engine {
    /// Evaluation subject exposing the columns compatibility rules may read.
    pub fn subject(&self) -> Subject {
        Subject::engine(
            &self.name,
            json!({
                "name": self.name,
                "brand": self.brand,
                "displacement_cc": self.displacement_cc,
                "horsepower": self.horsepower,
                "torque": self.torque,
                "shaft_diameter": self.shaft_diameter,
                "shaft_length": self.shaft_length,
                "shaft_type": self.shaft_type,
                "mount_type": self.mount_type,
                "weight_lbs": self.weight_lbs,
                "price": self.price,
            }),
        )
    }
}

/// DTO for inserting an engine.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEngine {
    pub slug: String,
    pub name: String,
    pub brand: String,
    pub displacement_cc: i32,
    pub horsepower: f64,
    pub torque: f64,
    pub shaft_diameter: f64,
    pub shaft_length: f64,
    pub shaft_type: Option<String>,
    pub mount_type: String,
    pub weight_lbs: Option<f64>,
    pub price: Option<f64>,
}
