//! Bulk operation constants, validators, and field registries.
//!
//! Provides entity/operation/status enums, filter and change validation,
//! preview composition and warnings, and the undo-window rules. Everything
//! here is pure; the SQL lives in `kartparts-db`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::{is_part_category, PART_CATEGORIES};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Limits and thresholds
// ---------------------------------------------------------------------------

/// PostgreSQL advisory lock ID held while a bulk operation mutates the
/// catalog. Only one execution or undo runs at a time.
pub const BULK_LOCK_ID: i64 = 736_451_902;

/// Default undo window in days.
pub const DEFAULT_UNDO_RETENTION_DAYS: i64 = 30;

/// Number of rows returned as samples in a preview.
pub const PREVIEW_SAMPLE_SIZE: i64 = 5;

/// Hard cap on rows touched by one operation, so the snapshot stays bounded.
pub const MAX_AFFECTED_ROWS: i64 = 10_000;

/// Maximum explicit IDs in a filter.
pub const MAX_FILTER_IDS: usize = 1_000;

/// Maximum length of the free-text search term.
pub const MAX_SEARCH_LEN: usize = 200;

/// Above this many rows the preview suggests trying a smaller subset.
pub const LARGE_OPERATION_THRESHOLD: i64 = 100;

/// Above this many rows a deactivation gets a visibility warning.
pub const MASS_DEACTIVATION_THRESHOLD: i64 = 10;

/// Column stamped by soft deletes.
pub const DELETED_AT_FIELD: &str = "deleted_at";

/// Shaft types accepted for engines.
pub const SHAFT_TYPES: &[&str] = &["straight", "tapered", "threaded"];

// ---------------------------------------------------------------------------
// Entity types and field registry
// ---------------------------------------------------------------------------

/// JSON shape a change value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Integer,
    Boolean,
    Object,
}

/// A column that bulk operations may rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

const fn field(name: &'static str, kind: FieldKind, nullable: bool) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        nullable,
    }
}

const ENGINE_EDITABLE: &[FieldSpec] = &[
    field("name", FieldKind::Text, false),
    field("brand", FieldKind::Text, false),
    field("displacement_cc", FieldKind::Integer, false),
    field("horsepower", FieldKind::Number, false),
    field("torque", FieldKind::Number, false),
    field("shaft_diameter", FieldKind::Number, false),
    field("shaft_length", FieldKind::Number, false),
    field("shaft_type", FieldKind::Text, false),
    field("mount_type", FieldKind::Text, false),
    field("weight_lbs", FieldKind::Number, true),
    field("price", FieldKind::Number, true),
    field("is_active", FieldKind::Boolean, false),
];

const PART_EDITABLE: &[FieldSpec] = &[
    field("name", FieldKind::Text, false),
    field("category", FieldKind::Text, false),
    field("brand", FieldKind::Text, true),
    field("specifications", FieldKind::Object, false),
    field("price", FieldKind::Number, true),
    field("is_active", FieldKind::Boolean, false),
];

const BUILD_EDITABLE: &[FieldSpec] = &[
    field("name", FieldKind::Text, false),
    field("description", FieldKind::Text, true),
    field("is_public", FieldKind::Boolean, false),
    field("is_active", FieldKind::Boolean, false),
];

/// Catalog entity a bulk operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkEntityType {
    Engine,
    Part,
    Build,
}

/// All valid entity type names.
pub const VALID_ENTITY_TYPES: &[&str] = &["engine", "part", "build"];

impl BulkEntityType {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Part => "part",
            Self::Build => "build",
        }
    }

    /// Parse from a string, returning an error for unknown entity types.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "engine" => Ok(Self::Engine),
            "part" => Ok(Self::Part),
            "build" => Ok(Self::Build),
            other => Err(CoreError::Validation(format!(
                "Unknown entity type: '{other}'. Valid types: {}",
                VALID_ENTITY_TYPES.join(", ")
            ))),
        }
    }

    /// Backing table.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Engine => "engines",
            Self::Part => "parts",
            Self::Build => "builds",
        }
    }

    /// Columns a bulk update may rewrite.
    pub fn editable_fields(&self) -> &'static [FieldSpec] {
        match self {
            Self::Engine => ENGINE_EDITABLE,
            Self::Part => PART_EDITABLE,
            Self::Build => BUILD_EDITABLE,
        }
    }

    /// Look up an editable field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.editable_fields().iter().find(|f| f.name == name)
    }

    /// Whether the table has a `brand` column to filter on.
    pub fn has_brand(&self) -> bool {
        !matches!(self, Self::Build)
    }
}

// ---------------------------------------------------------------------------
// Operation types
// ---------------------------------------------------------------------------

/// What a bulk operation does to each affected row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOperationType {
    Update,
    Activate,
    Deactivate,
    Delete,
}

/// All valid operation type names.
pub const VALID_OP_TYPES: &[&str] = &["update", "activate", "deactivate", "delete"];

impl BulkOperationType {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Delete => "delete",
        }
    }

    /// Parse from a string, returning an error for unknown types.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "update" => Ok(Self::Update),
            "activate" => Ok(Self::Activate),
            "deactivate" => Ok(Self::Deactivate),
            "delete" => Ok(Self::Delete),
            other => Err(CoreError::Validation(format!(
                "Unknown operation type: '{other}'. Valid types: {}",
                VALID_OP_TYPES.join(", ")
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Lifecycle state of a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOperationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// All valid status names.
pub const VALID_STATUSES: &[&str] = &["pending", "running", "completed", "failed", "cancelled"];

impl BulkOperationStatus {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse from a string, returning an error for unknown statuses.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CoreError::Validation(format!(
                "Unknown operation status: '{other}'. Valid statuses: {}",
                VALID_STATUSES.join(", ")
            ))),
        }
    }
}

/// Only pending operations can be executed.
pub fn can_execute(status: BulkOperationStatus) -> bool {
    matches!(status, BulkOperationStatus::Pending)
}

/// Only pending operations can be cancelled.
pub fn can_cancel(status: BulkOperationStatus) -> bool {
    matches!(status, BulkOperationStatus::Pending)
}

/// Check every precondition for undoing an operation at `now`.
pub fn check_undo(
    status: BulkOperationStatus,
    can_undo: bool,
    expires_at: Option<Timestamp>,
    now: Timestamp,
    has_snapshot: bool,
) -> Result<(), CoreError> {
    if status != BulkOperationStatus::Completed {
        return Err(CoreError::Conflict(
            "Only completed operations can be undone".to_string(),
        ));
    }
    if !can_undo {
        return Err(CoreError::Conflict(
            "This operation cannot be undone".to_string(),
        ));
    }
    if expires_at.is_some_and(|exp| exp <= now) {
        return Err(CoreError::Conflict("Undo window has expired".to_string()));
    }
    if !has_snapshot {
        return Err(CoreError::Conflict(
            "No snapshot available for undo".to_string(),
        ));
    }
    Ok(())
}

/// End of the undo window for an operation started (or scheduled) at `base`.
pub fn undo_expiry(base: Timestamp, retention_days: i64) -> Timestamp {
    base + chrono::Duration::days(retention_days)
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Row selection for a bulk operation. All present criteria are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<DbId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl BulkFilter {
    /// Whether no criterion is set, i.e. the filter selects every row.
    pub fn is_unrestricted(&self) -> bool {
        self.ids.is_none()
            && self.is_active.is_none()
            && self.brand.is_none()
            && self.category.is_none()
            && self.search.is_none()
    }
}

/// Validate a filter against the target entity.
pub fn validate_filter(entity: BulkEntityType, filter: &BulkFilter) -> Result<(), CoreError> {
    if let Some(ids) = &filter.ids {
        if ids.is_empty() {
            return Err(CoreError::Validation(
                "Filter ids must not be empty when provided".to_string(),
            ));
        }
        if ids.len() > MAX_FILTER_IDS {
            return Err(CoreError::Validation(format!(
                "Filter ids exceed maximum of {MAX_FILTER_IDS}"
            )));
        }
    }
    if let Some(brand) = &filter.brand {
        if !entity.has_brand() {
            return Err(CoreError::Validation(format!(
                "Brand filter is not supported for {}",
                entity.as_str()
            )));
        }
        if brand.trim().is_empty() {
            return Err(CoreError::Validation(
                "Brand filter must not be empty".to_string(),
            ));
        }
    }
    if let Some(category) = &filter.category {
        if entity != BulkEntityType::Part {
            return Err(CoreError::Validation(
                "Category filter is only supported for parts".to_string(),
            ));
        }
        if !is_part_category(category) {
            return Err(CoreError::Validation(format!(
                "Unknown part category: '{category}'"
            )));
        }
    }
    if let Some(search) = &filter.search {
        if search.trim().is_empty() {
            return Err(CoreError::Validation(
                "Search term must not be empty".to_string(),
            ));
        }
        if search.len() > MAX_SEARCH_LEN {
            return Err(CoreError::Validation(format!(
                "Search term exceeds maximum length of {MAX_SEARCH_LEN} characters"
            )));
        }
    }
    Ok(())
}

/// Turn a search term into a case-insensitive `LIKE` pattern, escaping the
/// wildcard characters it contains.
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// ---------------------------------------------------------------------------
// Changes
// ---------------------------------------------------------------------------

fn validate_change_value(
    entity: BulkEntityType,
    spec: &FieldSpec,
    value: &Value,
) -> Result<(), CoreError> {
    if value.is_null() {
        return if spec.nullable {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Field '{}' cannot be set to null",
                spec.name
            )))
        };
    }

    let ok = match spec.kind {
        FieldKind::Text => value.is_string(),
        FieldKind::Number => value.is_number(),
        FieldKind::Integer => value.is_i64(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Object => value.is_object(),
    };
    if !ok {
        return Err(CoreError::Validation(format!(
            "Field '{}' has the wrong type (expected {:?})",
            spec.name, spec.kind
        )));
    }

    match (entity, spec.name) {
        (BulkEntityType::Part, "category") => {
            let category = value.as_str().unwrap_or_default();
            if !PART_CATEGORIES.contains(&category) {
                return Err(CoreError::Validation(format!(
                    "Unknown part category: '{category}'"
                )));
            }
        }
        (BulkEntityType::Engine, "shaft_type") => {
            let shaft = value.as_str().unwrap_or_default();
            if !SHAFT_TYPES.contains(&shaft) {
                return Err(CoreError::Validation(format!(
                    "Unknown shaft type: '{shaft}'. Valid types: {}",
                    SHAFT_TYPES.join(", ")
                )));
            }
        }
        (_, "name") => {
            if value.as_str().is_some_and(|s| s.trim().is_empty()) {
                return Err(CoreError::Validation("Name must not be empty".to_string()));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Resolve the changes an operation will actually write.
///
/// - `update` needs at least one change, each an editable field with a value
///   of the right type.
/// - `activate` / `deactivate` always write `is_active` and accept no other
///   field.
/// - `delete` accepts no changes; it stamps `deleted_at`.
pub fn effective_changes(
    entity: BulkEntityType,
    op_type: BulkOperationType,
    changes: &Map<String, Value>,
) -> Result<Map<String, Value>, CoreError> {
    match op_type {
        BulkOperationType::Update => {
            if changes.is_empty() {
                return Err(CoreError::Validation(
                    "Update operations require at least one change".to_string(),
                ));
            }
            for (name, value) in changes {
                let spec = entity.field(name).ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Field '{name}' cannot be bulk-edited on {}",
                        entity.as_str()
                    ))
                })?;
                validate_change_value(entity, spec, value)?;
            }
            Ok(changes.clone())
        }
        BulkOperationType::Activate | BulkOperationType::Deactivate => {
            let target = op_type == BulkOperationType::Activate;
            if let Some(other) = changes.keys().find(|k| k.as_str() != "is_active") {
                return Err(CoreError::Validation(format!(
                    "Field '{other}' is not allowed for {} operations",
                    op_type.as_str()
                )));
            }
            if changes
                .get("is_active")
                .is_some_and(|v| v.as_bool() != Some(target))
            {
                return Err(CoreError::Validation(format!(
                    "is_active must be {target} for {} operations",
                    op_type.as_str()
                )));
            }
            let mut effective = Map::new();
            effective.insert("is_active".to_string(), Value::Bool(target));
            Ok(effective)
        }
        BulkOperationType::Delete => {
            if !changes.is_empty() {
                return Err(CoreError::Validation(
                    "Delete operations do not accept changes".to_string(),
                ));
            }
            Ok(Map::new())
        }
    }
}

/// Columns rewritten by an operation, and therefore restored on undo.
///
/// `changes` must already have passed [`effective_changes`].
pub fn restorable_fields(
    entity: BulkEntityType,
    op_type: BulkOperationType,
    changes: &Map<String, Value>,
) -> Result<Vec<&'static str>, CoreError> {
    if op_type == BulkOperationType::Delete {
        return Ok(vec![DELETED_AT_FIELD]);
    }
    changes
        .keys()
        .map(|name| {
            entity.field(name).map(|f| f.name).ok_or_else(|| {
                CoreError::Validation(format!(
                    "Field '{name}' cannot be bulk-edited on {}",
                    entity.as_str()
                ))
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// One sampled row with its current and post-operation state.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewItem {
    pub id: DbId,
    pub name: String,
    pub current: Value,
    /// `null` for deletes.
    pub preview: Value,
}

/// Result of previewing an operation without applying it.
#[derive(Debug, Clone, Serialize)]
pub struct BulkPreview {
    pub affected_count: i64,
    pub sample_items: Vec<PreviewItem>,
    pub warnings: Vec<String>,
}

/// Shallow-merge `changes` onto a row. Deleted rows preview as `null`.
pub fn preview_item(
    op_type: BulkOperationType,
    current: &Value,
    changes: &Map<String, Value>,
) -> Value {
    if op_type == BulkOperationType::Delete {
        return Value::Null;
    }
    let mut merged = current.clone();
    if let Some(obj) = merged.as_object_mut() {
        for (k, v) in changes {
            obj.insert(k.clone(), v.clone());
        }
    }
    merged
}

/// Human-readable cautions shown alongside a preview.
pub fn preview_warnings(
    entity: BulkEntityType,
    op_type: BulkOperationType,
    filter: &BulkFilter,
    affected_count: i64,
    changes: &Map<String, Value>,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if affected_count == 0 {
        warnings.push("No items match this filter.".to_string());
    }
    if filter.is_unrestricted() && affected_count > 0 {
        warnings.push(format!(
            "No filter applied: every {} will be affected.",
            entity.as_str()
        ));
    }
    if affected_count > LARGE_OPERATION_THRESHOLD {
        warnings.push(format!(
            "This will affect {affected_count} items. Consider testing on a smaller subset first."
        ));
    }
    if affected_count > MAX_AFFECTED_ROWS {
        warnings.push(format!(
            "This exceeds the limit of {MAX_AFFECTED_ROWS} items per operation and will be rejected."
        ));
    }
    if changes
        .get("price")
        .and_then(Value::as_f64)
        .is_some_and(|p| p < 0.0)
    {
        warnings.push("Negative prices detected. Please verify this is intentional.".to_string());
    }
    if changes.get("is_active") == Some(&Value::Bool(false))
        && affected_count > MASS_DEACTIVATION_THRESHOLD
    {
        warnings.push(format!(
            "This will deactivate {affected_count} items. They will no longer be visible to users."
        ));
    }
    if op_type == BulkOperationType::Delete && affected_count > 0 {
        warnings.push(format!(
            "This will delete {affected_count} items. They can be restored by undoing the operation \
             until it expires."
        ));
    }

    warnings
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Prior state of one affected row, stored on the operation for undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: DbId,
    pub data: Value,
}

/// Per-row error recorded on a failed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    pub error: String,
}
