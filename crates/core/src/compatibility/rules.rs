//! Compatibility rule, condition, and warning types.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::{
    is_part_category, ENGINE_CATEGORY, ENGINE_FIELDS, PART_FIELDS, SPECIFICATIONS_PREFIX,
};
use crate::error::CoreError;
use crate::types::DbId;

/// Valid `specifications.<key>` keys: lowercase snake_case.
static SPEC_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("static regex is valid"));

/// A compatibility rule as loaded from the database. `condition` is kept as
/// raw JSON and parsed at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityRule {
    pub id: DbId,
    pub rule_type: String,
    pub source_category: String,
    pub target_category: String,
    pub condition: Value,
    pub warning_message: String,
    pub severity: Severity,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// How loudly a violated rule is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Parse from a string, returning an error for unknown severities.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            _ => Err(CoreError::Validation(
                "Severity must be error, warning, or info".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison operators
// ---------------------------------------------------------------------------

/// Operator applied between the source value and each target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Contains,
}

/// All valid operator names.
pub const VALID_COMPARE_OPS: &[&str] = &[
    "equal",
    "not_equal",
    "greater_than",
    "less_than",
    "greater_than_or_equal",
    "less_than_or_equal",
    "contains",
];

impl CompareOp {
    /// Return the string representation stored in conditions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::Contains => "contains",
        }
    }

    /// Parse from a string, returning an error for unknown operators.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "equal" => Ok(Self::Equal),
            "not_equal" => Ok(Self::NotEqual),
            "greater_than" => Ok(Self::GreaterThan),
            "less_than" => Ok(Self::LessThan),
            "greater_than_or_equal" => Ok(Self::GreaterThanOrEqual),
            "less_than_or_equal" => Ok(Self::LessThanOrEqual),
            "contains" => Ok(Self::Contains),
            other => Err(CoreError::Validation(format!(
                "Unknown comparison operator: '{other}'. Valid operators: {}",
                VALID_COMPARE_OPS.join(", ")
            ))),
        }
    }

    /// Whether the operator compares numerically.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::GreaterThan | Self::LessThan | Self::GreaterThanOrEqual | Self::LessThanOrEqual
        )
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// A parsed rule condition.
///
/// Canonical JSON shape:
/// `{"compare": "equal", "source_field": "shaft_diameter",
///   "target_field": "specifications.bore_diameter", "tolerance": 0.01}`
///
/// The legacy builder shape `{"source_key", "target_key", "comparison"}` is
/// also accepted; its keys always address `specifications`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleCondition {
    pub compare: CompareOp,
    pub source_field: String,
    pub target_field: String,
    pub tolerance: Option<f64>,
}

impl RuleCondition {
    /// Parse a condition from either the canonical or the legacy shape.
    pub fn parse(value: &Value) -> Result<Self, CoreError> {
        let obj = value.as_object().ok_or_else(|| {
            CoreError::Validation("Rule condition must be a JSON object".to_string())
        })?;

        if obj.contains_key("source_key") || obj.contains_key("target_key") {
            return Self::parse_legacy(obj);
        }

        let compare = required_str(obj, "compare")?;
        let source_field = required_str(obj, "source_field")?;
        let target_field = required_str(obj, "target_field")?;
        let tolerance = match obj.get("tolerance") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let t = v.as_f64().ok_or_else(|| {
                    CoreError::Validation("Condition tolerance must be a number".to_string())
                })?;
                if t < 0.0 {
                    return Err(CoreError::Validation(
                        "Condition tolerance must not be negative".to_string(),
                    ));
                }
                Some(t)
            }
        };

        Ok(Self {
            compare: CompareOp::parse(compare)?,
            source_field: source_field.to_string(),
            target_field: target_field.to_string(),
            tolerance,
        })
    }

    fn parse_legacy(obj: &serde_json::Map<String, Value>) -> Result<Self, CoreError> {
        let source_key = required_str(obj, "source_key")?;
        let target_key = required_str(obj, "target_key")?;
        let compare = match obj.get("comparison").and_then(Value::as_str) {
            None | Some("equals") => CompareOp::Equal,
            Some("not_equals") => CompareOp::NotEqual,
            Some(other) => {
                return Err(CoreError::Validation(format!(
                    "Unknown legacy comparison: '{other}'. Expected equals or not_equals"
                )))
            }
        };
        Ok(Self {
            compare,
            source_field: format!("{SPECIFICATIONS_PREFIX}{source_key}"),
            target_field: format!("{SPECIFICATIONS_PREFIX}{target_key}"),
            tolerance: None,
        })
    }

    /// Serialize to the canonical JSON shape.
    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "compare": self.compare.as_str(),
            "source_field": self.source_field,
            "target_field": self.target_field,
        });
        if let Some(t) = self.tolerance {
            value["tolerance"] = json!(t);
        }
        value
    }
}

fn required_str<'a>(
    obj: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Result<&'a str, CoreError> {
    match obj.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(CoreError::Validation(format!(
            "Rule condition is missing '{key}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Rule validation
// ---------------------------------------------------------------------------

/// Validate that `path` addresses a readable field of `category`.
pub fn validate_field_path(category: &str, path: &str) -> Result<(), CoreError> {
    if category == ENGINE_CATEGORY {
        if ENGINE_FIELDS.contains(&path) {
            return Ok(());
        }
        return Err(CoreError::Validation(format!(
            "Field '{path}' is not valid for engines. Valid fields: {}",
            ENGINE_FIELDS.join(", ")
        )));
    }

    if PART_FIELDS.contains(&path) {
        return Ok(());
    }
    if let Some(key) = path.strip_prefix(SPECIFICATIONS_PREFIX) {
        if SPEC_KEY_RE.is_match(key) {
            return Ok(());
        }
    }
    Err(CoreError::Validation(format!(
        "Field '{path}' is not valid for category '{category}'. Use one of {} \
         or specifications.<key>",
        PART_FIELDS.join(", ")
    )))
}

/// Validate a rule's category pair and condition, returning the parsed
/// condition on success.
///
/// The source may be `engine` or any part category; the target must be a
/// part category. Both field paths must be valid for their category.
pub fn validate_rule(
    source_category: &str,
    target_category: &str,
    condition: &Value,
) -> Result<RuleCondition, CoreError> {
    if source_category != ENGINE_CATEGORY && !is_part_category(source_category) {
        return Err(CoreError::Validation(format!(
            "Unknown source category: '{source_category}'"
        )));
    }
    if !is_part_category(target_category) {
        return Err(CoreError::Validation(format!(
            "Unknown target category: '{target_category}'"
        )));
    }

    let parsed = RuleCondition::parse(condition)?;
    validate_field_path(source_category, &parsed.source_field)?;
    validate_field_path(target_category, &parsed.target_field)?;
    Ok(parsed)
}

/// Reject a blank `rule_type` or `warning_message`.
pub fn validate_rule_text(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// A single compatibility finding reported to the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityWarning {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub source: String,
    pub target: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<DbId>,
}
