//! Rule evaluator: pure logic, no database access.

use serde_json::Value;

use super::rules::{CompareOp, CompatibilityRule, CompatibilityWarning, RuleCondition};
use crate::catalog::{ENGINE_CATEGORY, SPECIFICATIONS_PREFIX};

/// Alternate `specifications` keys tried when the requested key is absent.
/// Ingested parts use `bore_in`/`chain_size`; older rows use
/// `bore_diameter`/`pitch`.
const SPEC_KEY_ALIASES: &[(&str, &[&str])] = &[
    ("bore_diameter", &["bore_in", "bore_mm"]),
    ("bore_in", &["bore_diameter"]),
    ("pitch", &["chain_size"]),
    ("chain_size", &["pitch"]),
];

/// A selected engine or part, flattened to its row JSON.
#[derive(Debug, Clone)]
pub struct Subject {
    pub name: String,
    /// `engine` for engines, the part category otherwise.
    pub category: String,
    pub data: Value,
}

impl Subject {
    pub fn new(name: impl Into<String>, category: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            data,
        }
    }

    /// Build an engine subject.
    pub fn engine(name: impl Into<String>, data: Value) -> Self {
        Self::new(name, ENGINE_CATEGORY, data)
    }
}

/// Read a value by dot path. `specifications.<key>` lookups fall back to
/// the key's aliases.
pub fn lookup_field<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(key) = path.strip_prefix(SPECIFICATIONS_PREFIX) {
        let specs = data.get("specifications")?.as_object()?;
        if let Some(v) = specs.get(key) {
            return Some(v);
        }
        let aliases = SPEC_KEY_ALIASES
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, alts)| *alts)?;
        return aliases.iter().find_map(|alt| specs.get(*alt));
    }

    path.split('.')
        .try_fold(data, |current, segment| current.get(segment))
}

/// Numeric view of a JSON value: numbers and numeric strings.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn values_equal(source: &Value, target: &Value, tolerance: f64) -> bool {
    match (as_number(source), as_number(target)) {
        (Some(a), Some(b)) => (a - b).abs() <= tolerance,
        _ => source == target,
    }
}

/// Compare a source and target value. Returns `true` when the pair is
/// compatible.
///
/// A missing or null value on either side always passes. Numeric operators
/// pass when either side is not numeric.
pub fn compare_values(
    op: CompareOp,
    source: Option<&Value>,
    target: Option<&Value>,
    tolerance: f64,
) -> bool {
    let (source, target) = match (source, target) {
        (Some(s), Some(t)) if !s.is_null() && !t.is_null() => (s, t),
        _ => return true,
    };

    if op.is_numeric() {
        let (Some(a), Some(b)) = (as_number(source), as_number(target)) else {
            return true;
        };
        return match op {
            CompareOp::GreaterThan => a > b,
            CompareOp::LessThan => a < b,
            CompareOp::GreaterThanOrEqual => a >= b,
            CompareOp::LessThanOrEqual => a <= b,
            _ => true,
        };
    }

    match op {
        CompareOp::Equal => values_equal(source, target, tolerance),
        CompareOp::NotEqual => !values_equal(source, target, tolerance),
        CompareOp::Contains => string_form(source).contains(&string_form(target)),
        _ => true,
    }
}

/// Evaluate one rule. Returns a warning for the first violating target part.
///
/// The source is the engine for `engine` rules, otherwise the first selected
/// part of the source category. Rules with an unparseable condition pass.
pub fn evaluate_rule(
    rule: &CompatibilityRule,
    engine: Option<&Subject>,
    parts: &[Subject],
) -> Option<CompatibilityWarning> {
    let condition = RuleCondition::parse(&rule.condition).ok()?;

    let source = if rule.source_category == ENGINE_CATEGORY {
        engine
    } else {
        parts.iter().find(|p| p.category == rule.source_category)
    };
    let source_value = source.and_then(|s| lookup_field(&s.data, &condition.source_field));
    let source_name = source.map_or("Unknown", |s| s.name.as_str());
    let tolerance = condition.tolerance.unwrap_or(0.0);

    parts
        .iter()
        .filter(|p| p.category == rule.target_category)
        .find_map(|target| {
            let target_value = lookup_field(&target.data, &condition.target_field);
            if compare_values(condition.compare, source_value, target_value, tolerance) {
                None
            } else {
                Some(CompatibilityWarning {
                    severity: rule.severity,
                    source: source_name.to_string(),
                    target: target.name.clone(),
                    message: rule.warning_message.clone(),
                    rule_id: Some(rule.id),
                })
            }
        })
}

/// Evaluate every active rule, one warning per violated rule.
pub fn evaluate_rules(
    rules: &[CompatibilityRule],
    engine: Option<&Subject>,
    parts: &[Subject],
) -> Vec<CompatibilityWarning> {
    rules
        .iter()
        .filter(|r| r.is_active)
        .filter_map(|r| evaluate_rule(r, engine, parts))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::rules::Severity;
    use serde_json::json;

    fn rule(source: &str, target: &str, condition: Value, severity: Severity) -> CompatibilityRule {
        CompatibilityRule {
            id: 7,
            rule_type: "fit".to_string(),
            source_category: source.to_string(),
            target_category: target.to_string(),
            condition,
            warning_message: format!("{source} vs {target}"),
            severity,
            is_active: true,
        }
    }

    fn shaft_rule() -> CompatibilityRule {
        rule(
            "engine",
            "clutch",
            json!({
                "compare": "equal",
                "source_field": "shaft_diameter",
                "target_field": "specifications.bore_diameter"
            }),
            Severity::Error,
        )
    }

    fn engine(shaft: f64) -> Subject {
        Subject::engine("Predator 212", json!({"name": "Predator 212", "shaft_diameter": shaft}))
    }

    fn clutch(name: &str, specs: Value) -> Subject {
        Subject::new(name, "clutch", json!({"name": name, "specifications": specs}))
    }

    // -- lookup_field -------------------------------------------------------

    #[test]
    fn lookup_top_level_and_nested() {
        let data = json!({"a": {"b": {"c": 3}}, "x": 1});
        assert_eq!(lookup_field(&data, "x"), Some(&json!(1)));
        assert_eq!(lookup_field(&data, "a.b.c"), Some(&json!(3)));
        assert_eq!(lookup_field(&data, "a.z"), None);
    }

    #[test]
    fn lookup_spec_uses_aliases() {
        let data = json!({"specifications": {"bore_in": 0.75, "chain_size": "#35"}});
        assert_eq!(
            lookup_field(&data, "specifications.bore_diameter"),
            Some(&json!(0.75))
        );
        assert_eq!(lookup_field(&data, "specifications.pitch"), Some(&json!("#35")));
        assert_eq!(lookup_field(&data, "specifications.width"), None);
    }

    #[test]
    fn lookup_spec_prefers_direct_key() {
        let data = json!({"specifications": {"bore_diameter": 1.0, "bore_in": 0.75}});
        assert_eq!(
            lookup_field(&data, "specifications.bore_diameter"),
            Some(&json!(1.0))
        );
    }

    #[test]
    fn lookup_spec_without_specifications_is_none() {
        let data = json!({"specifications": null});
        assert_eq!(lookup_field(&data, "specifications.pitch"), None);
    }

    // -- compare_values -----------------------------------------------------

    #[test]
    fn missing_values_pass() {
        assert!(compare_values(CompareOp::Equal, None, Some(&json!(1)), 0.0));
        assert!(compare_values(CompareOp::Equal, Some(&json!(1)), Some(&Value::Null), 0.0));
    }

    #[test]
    fn equal_is_numeric_when_both_numeric() {
        assert!(compare_values(CompareOp::Equal, Some(&json!(1)), Some(&json!(1.0)), 0.0));
        assert!(compare_values(CompareOp::Equal, Some(&json!("0.75")), Some(&json!(0.75)), 0.0));
        assert!(!compare_values(CompareOp::Equal, Some(&json!(0.75)), Some(&json!(1.0)), 0.0));
    }

    #[test]
    fn equal_respects_tolerance() {
        assert!(compare_values(CompareOp::Equal, Some(&json!(0.75)), Some(&json!(0.755)), 0.01));
        assert!(!compare_values(CompareOp::Equal, Some(&json!(0.75)), Some(&json!(0.8)), 0.01));
    }

    #[test]
    fn equal_on_strings_is_exact() {
        assert!(compare_values(CompareOp::Equal, Some(&json!("#35")), Some(&json!("#35")), 0.0));
        assert!(!compare_values(CompareOp::Equal, Some(&json!("#35")), Some(&json!("#40")), 0.0));
        assert!(compare_values(CompareOp::NotEqual, Some(&json!("#35")), Some(&json!("#40")), 0.0));
    }

    #[test]
    fn numeric_operators() {
        let five = json!(5);
        let three = json!("3");
        assert!(compare_values(CompareOp::GreaterThan, Some(&five), Some(&three), 0.0));
        assert!(!compare_values(CompareOp::LessThan, Some(&five), Some(&three), 0.0));
        assert!(compare_values(CompareOp::GreaterThanOrEqual, Some(&five), Some(&five), 0.0));
        assert!(compare_values(CompareOp::LessThanOrEqual, Some(&three), Some(&five), 0.0));
    }

    #[test]
    fn numeric_operator_with_text_passes() {
        assert!(compare_values(
            CompareOp::GreaterThan,
            Some(&json!("big")),
            Some(&json!(3)),
            0.0
        ));
    }

    #[test]
    fn contains_uses_string_forms() {
        assert!(compare_values(
            CompareOp::Contains,
            Some(&json!("4-bolt 4x100")),
            Some(&json!("4x100")),
            0.0
        ));
        assert!(compare_values(CompareOp::Contains, Some(&json!(212)), Some(&json!(21)), 0.0));
        assert!(!compare_values(CompareOp::Contains, Some(&json!("abc")), Some(&json!("z")), 0.0));
    }

    // -- evaluate_rule ------------------------------------------------------

    #[test]
    fn shaft_mismatch_produces_error() {
        let parts = vec![clutch("Max-Torque 1\"", json!({"bore_diameter": 1.0}))];
        let warning = evaluate_rule(&shaft_rule(), Some(&engine(0.75)), &parts).unwrap();
        assert_eq!(warning.severity, Severity::Error);
        assert_eq!(warning.source, "Predator 212");
        assert_eq!(warning.target, "Max-Torque 1\"");
        assert_eq!(warning.rule_id, Some(7));
    }

    #[test]
    fn shaft_match_via_alias_passes() {
        let parts = vec![clutch("Hilliard 3/4", json!({"bore_in": 0.75}))];
        assert!(evaluate_rule(&shaft_rule(), Some(&engine(0.75)), &parts).is_none());
    }

    #[test]
    fn engine_rule_without_engine_passes() {
        let parts = vec![clutch("Max-Torque 1\"", json!({"bore_diameter": 1.0}))];
        assert!(evaluate_rule(&shaft_rule(), None, &parts).is_none());
    }

    #[test]
    fn part_sourced_rule_uses_first_source_part() {
        let r = rule(
            "chain",
            "sprocket",
            json!({"source_key": "pitch", "target_key": "pitch"}),
            Severity::Warning,
        );
        let parts = vec![
            Subject::new("#35 Chain", "chain", json!({"specifications": {"pitch": "#35"}})),
            Subject::new("#40 Chain", "chain", json!({"specifications": {"pitch": "#40"}})),
            Subject::new("60T", "sprocket", json!({"specifications": {"pitch": "#40"}})),
        ];
        let warning = evaluate_rule(&r, None, &parts).unwrap();
        assert_eq!(warning.source, "#35 Chain");
        assert_eq!(warning.target, "60T");
        assert_eq!(warning.severity, Severity::Warning);
    }

    #[test]
    fn first_violating_target_is_reported() {
        let parts = vec![
            clutch("Good", json!({"bore_diameter": 0.75})),
            clutch("Bad A", json!({"bore_diameter": 1.0})),
            clutch("Bad B", json!({"bore_diameter": 0.625})),
        ];
        let warning = evaluate_rule(&shaft_rule(), Some(&engine(0.75)), &parts).unwrap();
        assert_eq!(warning.target, "Bad A");
    }

    #[test]
    fn malformed_condition_passes() {
        let r = rule("engine", "clutch", json!({"compare": "equal"}), Severity::Error);
        let parts = vec![clutch("X", json!({"bore_diameter": 1.0}))];
        assert!(evaluate_rule(&r, Some(&engine(0.75)), &parts).is_none());
    }

    #[test]
    fn inactive_rules_are_skipped() {
        let mut r = shaft_rule();
        r.is_active = false;
        let parts = vec![clutch("X", json!({"bore_diameter": 1.0}))];
        assert!(evaluate_rules(&[r], Some(&engine(0.75)), &parts).is_empty());
    }

    #[test]
    fn one_warning_per_violated_rule() {
        let mut second = shaft_rule();
        second.id = 8;
        second.severity = Severity::Info;
        let parts = vec![
            clutch("A", json!({"bore_diameter": 1.0})),
            clutch("B", json!({"bore_diameter": 1.0})),
        ];
        let warnings = evaluate_rules(&[shaft_rule(), second], Some(&engine(0.75)), &parts);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].rule_id, Some(7));
        assert_eq!(warnings[1].rule_id, Some(8));
    }
}
