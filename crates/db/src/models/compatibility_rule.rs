//! Compatibility rule rows and DTOs.

use kartparts_core::compatibility::{CompatibilityRule, Severity};
use kartparts_core::error::CoreError;
use kartparts_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `compatibility_rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CompatibilityRuleRow {
    pub id: DbId,
    pub rule_type: String,
    pub source_category: String,
    pub target_category: String,
    pub condition: serde_json::Value,
    pub warning_message: String,
    pub severity: String,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CompatibilityRuleRow {
    /// Convert to the evaluator's rule type.
    pub fn to_rule(&self) -> Result<CompatibilityRule, CoreError> {
        Ok(CompatibilityRule {
            id: self.id,
            rule_type: self.rule_type.clone(),
            source_category: self.source_category.clone(),
            target_category: self.target_category.clone(),
            condition: self.condition.clone(),
            warning_message: self.warning_message.clone(),
            severity: Severity::parse(&self.severity)?,
            is_active: self.is_active,
        })
    }
}

/// DTO for inserting a rule. `condition` must already be validated and
/// normalised.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompatibilityRule {
    pub rule_type: String,
    pub source_category: String,
    pub target_category: String,
    pub condition: serde_json::Value,
    pub warning_message: String,
    pub severity: String,
    pub is_active: Option<bool>,
    pub created_by: Option<DbId>,
}

/// DTO for patching a rule (all fields optional).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCompatibilityRule {
    pub rule_type: Option<String>,
    pub source_category: Option<String>,
    pub target_category: Option<String>,
    pub condition: Option<serde_json::Value>,
    pub warning_message: Option<String>,
    pub severity: Option<String>,
    pub is_active: Option<bool>,
}

/// Optional criteria for listing rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompatibilityRuleFilter {
    pub rule_type: Option<String>,
    pub source_category: Option<String>,
    pub target_category: Option<String>,
    pub is_active: Option<bool>,
}
