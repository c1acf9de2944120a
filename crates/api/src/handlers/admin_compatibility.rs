//! Admin management of compatibility rules and engine-part mappings.
//!
//! Every rule write re-validates the category pair and condition, and
//! stores the condition in its canonical shape.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use kartparts_core::catalog::FitLevel;
use kartparts_core::compatibility::{validate_rule, validate_rule_text, Severity};
use kartparts_core::error::CoreError;
use kartparts_core::types::DbId;
use kartparts_db::models::compatibility_rule::{
    CompatibilityRuleRow, CreateCompatibilityRule, UpdateCompatibilityRule,
};
use kartparts_db::models::engine_part_compatibility::{
    EnginePartCompatibility, UpsertEnginePartCompatibility,
};
use kartparts_db::repositories::{
    CompatibilityRuleRepo, EnginePartCompatibilityRepo, EngineRepo, PartRepo,
};

use crate::error::{AppError, AppResult};
use crate::handlers::compatibility::RuleListParams;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRuleRequest {
    #[validate(length(min = 1, max = 50))]
    pub rule_type: String,
    pub source_category: String,
    pub target_category: String,
    pub condition: serde_json::Value,
    #[validate(length(min = 1, max = 500))]
    pub warning_message: String,
    pub severity: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRuleRequest {
    #[validate(length(min = 1, max = 50))]
    pub rule_type: Option<String>,
    pub source_category: Option<String>,
    pub target_category: Option<String>,
    pub condition: Option<serde_json::Value>,
    #[validate(length(min = 1, max = 500))]
    pub warning_message: Option<String>,
    pub severity: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRuleRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertMappingRequest {
    pub engine_id: DbId,
    pub part_id: DbId,
    pub compatibility_level: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

fn rule_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "CompatibilityRule",
        id,
    })
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/compatibility/rules
///
/// List rules, active or not, with optional filters.
pub async fn list_rules(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<RuleListParams>,
) -> AppResult<Json<DataResponse<Vec<CompatibilityRuleRow>>>> {
    let rules = CompatibilityRuleRepo::list(&state.pool, &params.into_filter(None)).await?;
    Ok(Json(DataResponse { data: rules }))
}

/// POST /api/v1/admin/compatibility/rules
///
/// Create a rule. Severity defaults to `warning`.
pub async fn create_rule(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateRuleRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    validate_rule_text("rule_type", &input.rule_type)?;
    validate_rule_text("warning_message", &input.warning_message)?;
    let condition = validate_rule(
        &input.source_category,
        &input.target_category,
        &input.condition,
    )?;
    let severity = match input.severity.as_deref() {
        Some(s) => Severity::parse(s)?,
        None => Severity::Warning,
    };

    let rule = CompatibilityRuleRepo::create(
        &state.pool,
        &CreateCompatibilityRule {
            rule_type: input.rule_type,
            source_category: input.source_category,
            target_category: input.target_category,
            condition: condition.to_json(),
            warning_message: input.warning_message,
            severity: severity.as_str().to_string(),
            is_active: input.is_active,
            created_by: Some(admin.user_id),
        },
    )
    .await?;

    tracing::info!(
        rule_id = rule.id,
        rule_type = %rule.rule_type,
        user_id = admin.user_id,
        "Compatibility rule created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: rule })))
}

/// PUT /api/v1/admin/compatibility/rules/{id}
///
/// Partially update a rule. The merged category pair and condition must
/// still be valid.
pub async fn update_rule(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateRuleRequest>,
) -> AppResult<Json<DataResponse<CompatibilityRuleRow>>> {
    input.validate()?;
    if let Some(rule_type) = &input.rule_type {
        validate_rule_text("rule_type", rule_type)?;
    }
    if let Some(message) = &input.warning_message {
        validate_rule_text("warning_message", message)?;
    }
    let existing = CompatibilityRuleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| rule_not_found(id))?;

    let touches_condition = input.source_category.is_some()
        || input.target_category.is_some()
        || input.condition.is_some();
    let condition = if touches_condition {
        let parsed = validate_rule(
            input
                .source_category
                .as_deref()
                .unwrap_or(&existing.source_category),
            input
                .target_category
                .as_deref()
                .unwrap_or(&existing.target_category),
            input.condition.as_ref().unwrap_or(&existing.condition),
        )?;
        Some(parsed.to_json())
    } else {
        None
    };
    let severity = input
        .severity
        .as_deref()
        .map(Severity::parse)
        .transpose()?
        .map(|s| s.as_str().to_string());

    let updated = CompatibilityRuleRepo::update(
        &state.pool,
        id,
        &UpdateCompatibilityRule {
            rule_type: input.rule_type,
            source_category: input.source_category,
            target_category: input.target_category,
            condition,
            warning_message: input.warning_message,
            severity,
            is_active: input.is_active,
        },
    )
    .await?
    .ok_or_else(|| rule_not_found(id))?;

    tracing::info!(rule_id = id, user_id = admin.user_id, "Compatibility rule updated");
    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/admin/compatibility/rules/{id}
///
/// Deactivate a rule. Rules are never removed.
pub async fn delete_rule(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    CompatibilityRuleRepo::set_active(&state.pool, id, false)
        .await?
        .ok_or_else(|| rule_not_found(id))?;
    tracing::info!(rule_id = id, user_id = admin.user_id, "Compatibility rule deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/compatibility/rules/{id}/toggle
///
/// Set a rule's active flag.
pub async fn toggle_rule(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ToggleRuleRequest>,
) -> AppResult<Json<DataResponse<CompatibilityRuleRow>>> {
    let rule = CompatibilityRuleRepo::set_active(&state.pool, id, input.is_active)
        .await?
        .ok_or_else(|| rule_not_found(id))?;
    tracing::info!(
        rule_id = id,
        is_active = input.is_active,
        user_id = admin.user_id,
        "Compatibility rule toggled"
    );
    Ok(Json(DataResponse { data: rule }))
}

// ---------------------------------------------------------------------------
// Mappings
// ---------------------------------------------------------------------------

/// PUT /api/v1/admin/compatibility/mappings
///
/// Create or replace the fit level of one engine/part pair.
pub async fn upsert_mapping(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<UpsertMappingRequest>,
) -> AppResult<Json<DataResponse<EnginePartCompatibility>>> {
    input.validate()?;
    let level = FitLevel::parse(&input.compatibility_level)?;

    if EngineRepo::find_by_id(&state.pool, input.engine_id)
        .await?
        .is_none()
    {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Engine",
            id: input.engine_id,
        }));
    }
    if PartRepo::find_by_id(&state.pool, input.part_id)
        .await?
        .is_none()
    {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Part",
            id: input.part_id,
        }));
    }

    let mapping = EnginePartCompatibilityRepo::upsert(
        &state.pool,
        &UpsertEnginePartCompatibility {
            engine_id: input.engine_id,
            part_id: input.part_id,
            compatibility_level: level.as_str().to_string(),
            notes: input.notes,
        },
    )
    .await?;

    tracing::info!(
        engine_id = mapping.engine_id,
        part_id = mapping.part_id,
        level = %mapping.compatibility_level,
        user_id = admin.user_id,
        "Engine-part mapping saved"
    );
    Ok(Json(DataResponse { data: mapping }))
}

/// DELETE /api/v1/admin/compatibility/mappings/{engine_id}/{part_id}
pub async fn delete_mapping(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((engine_id, part_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    if !EnginePartCompatibilityRepo::delete(&state.pool, engine_id, part_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "EnginePartCompatibility",
            id: part_id,
        }));
    }
    tracing::info!(engine_id, part_id, user_id = admin.user_id, "Engine-part mapping removed");
    Ok(StatusCode::NO_CONTENT)
}
