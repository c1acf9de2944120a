//! Catalog vocabulary: part categories, engine/part columns, and
//! engine-part fit levels.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Pseudo-category used by compatibility rules whose source is the engine.
pub const ENGINE_CATEGORY: &str = "engine";

/// Part categories. Must match the `parts.category` check constraint.
pub const PART_CATEGORIES: &[&str] = &[
    // Drive train
    "clutch",
    "torque_converter",
    "chain",
    "sprocket",
    // Chassis
    "axle",
    "wheel",
    "tire",
    "tire_front",
    "tire_rear",
    "brake",
    "throttle",
    "pedals",
    "frame",
    // Engine performance
    "carburetor",
    "exhaust",
    "air_filter",
    "camshaft",
    "valve_spring",
    "flywheel",
    "ignition",
    "connecting_rod",
    "piston",
    "crankshaft",
    "oil_system",
    "header",
    "fuel_system",
    "gasket",
    "hardware",
    "other",
    // Electric
    "battery",
    "motor_controller",
    "bms",
    "charger",
    "throttle_controller",
    "voltage_converter",
    "battery_mount",
    "wiring_harness",
    "fuse_kill_switch",
];

/// Engine columns a compatibility rule may read.
pub const ENGINE_FIELDS: &[&str] = &[
    "name",
    "brand",
    "displacement_cc",
    "horsepower",
    "torque",
    "shaft_diameter",
    "shaft_length",
    "shaft_type",
    "mount_type",
    "weight_lbs",
    "price",
];

/// Top-level part columns a compatibility rule may read. Anything deeper
/// goes through `specifications.<key>`.
pub const PART_FIELDS: &[&str] = &["name", "brand", "category", "price"];

/// Prefix for lookups inside a part's free-form `specifications` object.
pub const SPECIFICATIONS_PREFIX: &str = "specifications.";

/// Whether `category` is a known part category.
pub fn is_part_category(category: &str) -> bool {
    PART_CATEGORIES.contains(&category)
}

/// Validate a part category, returning a descriptive error otherwise.
pub fn validate_part_category(category: &str) -> Result<(), CoreError> {
    if is_part_category(category) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown part category: '{category}'"
        )))
    }
}

// ---------------------------------------------------------------------------
// Fit levels
// ---------------------------------------------------------------------------

/// Admin-assigned relationship between one engine and one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitLevel {
    DirectFit,
    RequiresModification,
    AdapterRequired,
}

impl FitLevel {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectFit => "direct_fit",
            Self::RequiresModification => "requires_modification",
            Self::AdapterRequired => "adapter_required",
        }
    }

    /// Parse from a string, returning an error for unknown levels.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "direct_fit" => Ok(Self::DirectFit),
            "requires_modification" => Ok(Self::RequiresModification),
            "adapter_required" => Ok(Self::AdapterRequired),
            other => Err(CoreError::Validation(format!(
                "Unknown compatibility level: '{other}'. Valid levels: \
                 direct_fit, requires_modification, adapter_required"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_categories() {
        assert!(is_part_category("clutch"));
        assert!(is_part_category("fuse_kill_switch"));
        assert!(!is_part_category("engine"));
        assert!(!is_part_category(""));
    }

    #[test]
    fn validate_part_category_rejects_unknown() {
        assert!(validate_part_category("sprocket").is_ok());
        assert!(validate_part_category("spaceship").is_err());
    }

    #[test]
    fn fit_level_parse() {
        assert_eq!(FitLevel::parse("direct_fit").unwrap(), FitLevel::DirectFit);
        assert_eq!(
            FitLevel::parse("adapter_required").unwrap(),
            FitLevel::AdapterRequired
        );
        assert!(FitLevel::parse("maybe").is_err());
    }

    #[test]
    fn fit_level_as_str_roundtrips_through_parse() {
        for level in [
            FitLevel::DirectFit,
            FitLevel::RequiresModification,
            FitLevel::AdapterRequired,
        ] {
            assert_eq!(FitLevel::parse(level.as_str()).unwrap(), level);
        }
    }
}
