//! Compatibility rule engine.
//!
//! Rule and condition types, a pure-logic evaluator, and the built-in
//! drive-train and mapping checks used by the builder.

pub mod checks;
pub mod evaluator;
pub mod rules;

pub use checks::{drive_train_checks, is_part_compatible, mapping_warning};
pub use evaluator::{compare_values, evaluate_rule, evaluate_rules, lookup_field, Subject};
pub use rules::{
    validate_field_path, validate_rule, validate_rule_text, CompareOp, CompatibilityRule, CompatibilityWarning,
    RuleCondition, Severity,
};
