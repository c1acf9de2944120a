//! Built-in checks that do not come from stored rules: drive-train
//! completeness, direct engine-part mappings, and compatible-part filtering.

use std::slice;

use super::evaluator::{evaluate_rule, Subject};
use super::rules::{CompatibilityRule, CompatibilityWarning, Severity};
use crate::catalog::{FitLevel, ENGINE_CATEGORY};

const CLUTCH: &str = "clutch";
const TORQUE_CONVERTER: &str = "torque_converter";

/// Structural warnings about the drive train of a selection.
///
/// - An engine with neither a clutch nor a torque converter gets an info hint.
/// - Selecting both a clutch and a torque converter gets a warning.
pub fn drive_train_checks(
    engine: Option<&Subject>,
    parts: &[Subject],
) -> Vec<CompatibilityWarning> {
    let has_clutch = parts.iter().any(|p| p.category == CLUTCH);
    let has_converter = parts.iter().any(|p| p.category == TORQUE_CONVERTER);
    let mut warnings = Vec::new();

    if engine.is_some() && !has_clutch && !has_converter {
        warnings.push(CompatibilityWarning {
            severity: Severity::Info,
            source: "Engine".to_string(),
            target: "Drive System".to_string(),
            message: "Consider adding a clutch or torque converter for power transfer"
                .to_string(),
            rule_id: None,
        });
    }

    if has_clutch && has_converter {
        warnings.push(CompatibilityWarning {
            severity: Severity::Warning,
            source: "Clutch".to_string(),
            target: "Torque Converter".to_string(),
            message: "You have both a clutch and torque converter selected. \
                      Usually only one is needed."
                .to_string(),
            rule_id: None,
        });
    }

    warnings
}

/// Warning implied by an explicit engine-part mapping, if any.
pub fn mapping_warning(
    engine_name: &str,
    part_name: &str,
    level: FitLevel,
    notes: Option<&str>,
) -> Option<CompatibilityWarning> {
    let (severity, default_message) = match level {
        FitLevel::DirectFit => return None,
        FitLevel::RequiresModification => (
            Severity::Warning,
            "This part requires modification to fit this engine",
        ),
        FitLevel::AdapterRequired => (
            Severity::Info,
            "An adapter is required to use this part with this engine",
        ),
    };
    Some(CompatibilityWarning {
        severity,
        source: engine_name.to_string(),
        target: part_name.to_string(),
        message: notes.unwrap_or(default_message).to_string(),
        rule_id: None,
    })
}

/// Whether `part` may be offered for `engine`.
///
/// A direct-fit mapping always wins. Otherwise the part is rejected when an
/// active, error-severity, engine-sourced rule targeting its category is
/// violated. Warnings and infos never hide a part.
pub fn is_part_compatible(
    rules: &[CompatibilityRule],
    engine: &Subject,
    part: &Subject,
    direct_fit: bool,
) -> bool {
    if direct_fit {
        return true;
    }
    !rules
        .iter()
        .filter(|r| {
            r.is_active
                && r.source_category == ENGINE_CATEGORY
                && r.target_category == part.category
        })
        .filter_map(|r| evaluate_rule(r, Some(engine), slice::from_ref(part)))
        .any(|w| w.severity == Severity::Error)
}
