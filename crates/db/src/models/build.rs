//! Saved user builds.

use kartparts_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `builds` table.
///
/// `parts` maps a part category to the selected part ID (or an array of IDs
/// for categories that allow several selections).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Build {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub engine_id: Option<DbId>,
    pub parts: serde_json::Value,
    pub total_price: f64,
    pub is_public: bool,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Build {
    /// Every distinct part ID referenced by the build, ascending.
    ///
    /// Accepts numbers and numeric strings; anything else is skipped.
    pub fn part_ids(&self) -> Vec<DbId> {
        fn as_id(value: &serde_json::Value) -> Option<DbId> {
            value
                .as_i64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        }

        let Some(map) = self.parts.as_object() else {
            return Vec::new();
        };
        let mut ids = Vec::new();
        for value in map.values() {
            match value {
                serde_json::Value::Array(items) => ids.extend(items.iter().filter_map(as_id)),
                other => ids.extend(as_id(other)),
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// DTO for inserting a build.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBuild {
    pub name: String,
    pub description: Option<String>,
    pub engine_id: Option<DbId>,
    pub parts: serde_json::Value,
    pub total_price: Option<f64>,
    pub is_public: Option<bool>,
    pub created_by: Option<DbId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn build(parts: serde_json::Value) -> Build {
        Build {
            id: 1,
            name: "Budget racer".into(),
            description: None,
            engine_id: Some(1),
            parts,
            total_price: 0.0,
            is_public: true,
            is_active: true,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn part_ids_accepts_numbers_strings_and_arrays() {
        let b = build(json!({"clutch": 4, "chain": "7", "hardware": [9, "10"], "other": null}));
        assert_eq!(b.part_ids(), vec![4, 7, 9, 10]);
    }

    #[test]
    fn part_ids_of_non_object_is_empty() {
        assert!(build(json!([1, 2])).part_ids().is_empty());
    }
}
