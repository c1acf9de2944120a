//! Public compatibility endpoints.
//!
//! Evaluates the active rule set, the built-in drive-train checks, and any
//! direct engine-part mappings against a selection of parts.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use kartparts_core::catalog::{validate_part_category, FitLevel};
use kartparts_core::compatibility::{
    self, CompatibilityRule, CompatibilityWarning, Severity,
};
use kartparts_core::error::CoreError;
use kartparts_core::types::DbId;
use kartparts_db::models::compatibility_rule::{CompatibilityRuleFilter, CompatibilityRuleRow};
use kartparts_db::models::engine::Engine;
use kartparts_db::models::engine_part_compatibility::EnginePartMapping;
use kartparts_db::models::part::Part;
use kartparts_db::repositories::{
    BuildRepo, CompatibilityRuleRepo, EnginePartCompatibilityRepo, EngineRepo, PartRepo,
};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for listing rules.
#[derive(Debug, Deserialize)]
pub struct RuleListParams {
    pub rule_type: Option<String>,
    pub source_category: Option<String>,
    pub target_category: Option<String>,
    pub is_active: Option<bool>,
}

impl RuleListParams {
    pub fn into_filter(self, default_active: Option<bool>) -> CompatibilityRuleFilter {
        CompatibilityRuleFilter {
            rule_type: self.rule_type,
            source_category: self.source_category,
            target_category: self.target_category,
            is_active: self.is_active.or(default_active),
        }
    }
}

/// Body for `POST /compatibility/check`.
#[derive(Debug, Deserialize, Validate)]
pub struct CheckRequest {
    pub engine_id: Option<DbId>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub part_ids: Vec<DbId>,
}

/// Outcome of evaluating a selection.
#[derive(Debug, Serialize)]
pub struct CompatibilityReport {
    /// `false` if any warning has `error` severity.
    pub compatible: bool,
    pub warnings: Vec<CompatibilityWarning>,
}

/// Query parameters for the compatible-parts listing.
#[derive(Debug, Deserialize)]
pub struct CompatiblePartsParams {
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_engine_exists(pool: &PgPool, id: DbId) -> AppResult<Engine> {
    EngineRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Engine",
            id,
        }))
}

/// Load every active rule in evaluator form.
pub async fn load_active_rules(pool: &PgPool) -> AppResult<Vec<CompatibilityRule>> {
    let rows = CompatibilityRuleRepo::list_active(pool).await?;
    Ok(rows
        .iter()
        .map(CompatibilityRuleRow::to_rule)
        .collect::<Result<Vec<_>, _>>()?)
}

/// Evaluate rules, drive-train checks, and direct mappings for a selection.
async fn evaluate_selection(
    pool: &PgPool,
    engine: Option<&Engine>,
    parts: &[Part],
) -> AppResult<CompatibilityReport> {
    let rules = load_active_rules(pool).await?;
    let engine_subject = engine.map(Engine::subject);
    let subjects: Vec<_> = parts.iter().map(Part::subject).collect();

    let mut warnings = compatibility::evaluate_rules(&rules, engine_subject.as_ref(), &subjects);
    warnings.extend(compatibility::drive_train_checks(
        engine_subject.as_ref(),
        &subjects,
    ));

    if let Some(engine) = engine {
        let ids: Vec<DbId> = parts.iter().map(|p| p.id).collect();
        let mappings = EnginePartCompatibilityRepo::find_for_parts(pool, engine.id, &ids).await?;
        for mapping in &mappings {
            let Some(part) = parts.iter().find(|p| p.id == mapping.part_id) else {
                continue;
            };
            if let Some(w) = compatibility::mapping_warning(
                &engine.name,
                &part.name,
                mapping.fit_level()?,
                mapping.notes.as_deref(),
            ) {
                warnings.push(w);
            }
        }
    }

    let compatible = !warnings.iter().any(|w| w.severity == Severity::Error);
    Ok(CompatibilityReport {
        compatible,
        warnings,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/compatibility/rules
///
/// List rules. Only active rules unless `is_active` says otherwise.
pub async fn list_rules(
    State(state): State<AppState>,
    Query(params): Query<RuleListParams>,
) -> AppResult<Json<DataResponse<Vec<CompatibilityRuleRow>>>> {
    let rules = CompatibilityRuleRepo::list(&state.pool, &params.into_filter(Some(true))).await?;
    Ok(Json(DataResponse { data: rules }))
}

/// POST /api/v1/compatibility/check
///
/// Evaluate an ad-hoc selection of an optional engine and parts.
pub async fn check(
    State(state): State<AppState>,
    Json(input): Json<CheckRequest>,
) -> AppResult<Json<DataResponse<CompatibilityReport>>> {
    input.validate()?;

    let engine = match input.engine_id {
        Some(id) => Some(ensure_engine_exists(&state.pool, id).await?),
        None => None,
    };

    let mut ids = input.part_ids;
    ids.sort_unstable();
    ids.dedup();
    let parts = PartRepo::find_by_ids(&state.pool, &ids).await?;
    if let Some(missing) = ids.iter().find(|id| !parts.iter().any(|p| p.id == **id)) {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Part",
            id: *missing,
        }));
    }

    let report = evaluate_selection(&state.pool, engine.as_ref(), &parts).await?;
    tracing::debug!(
        engine_id = ?input.engine_id,
        part_count = parts.len(),
        warning_count = report.warnings.len(),
        "Compatibility check evaluated"
    );
    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/compatibility/builds/{id}
///
/// Evaluate a saved build. Parts or engines deleted since the build was
/// saved are skipped.
pub async fn check_build(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CompatibilityReport>>> {
    let build = BuildRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Build",
            id,
        }))?;

    let engine = match build.engine_id {
        Some(engine_id) => EngineRepo::find_by_id(&state.pool, engine_id).await?,
        None => None,
    };
    let parts = PartRepo::find_by_ids(&state.pool, &build.part_ids()).await?;

    let report = evaluate_selection(&state.pool, engine.as_ref(), &parts).await?;
    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/compatibility/engines/{id}/parts
///
/// Active parts that may be offered for an engine, optionally restricted to
/// one category.
pub async fn compatible_parts(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<CompatiblePartsParams>,
) -> AppResult<Json<DataResponse<Vec<Part>>>> {
    if let Some(category) = params.category.as_deref() {
        validate_part_category(category)?;
    }
    let engine = ensure_engine_exists(&state.pool, id).await?;
    let engine_subject = engine.subject();

    let rules = load_active_rules(&state.pool).await?;
    let mappings = EnginePartCompatibilityRepo::list_for_engine(&state.pool, id).await?;
    let direct_fit: HashSet<DbId> = mappings
        .iter()
        .filter(|m| m.compatibility_level == FitLevel::DirectFit.as_str())
        .map(|m| m.part_id)
        .collect();

    let parts: Vec<Part> = PartRepo::list_active(&state.pool, params.category.as_deref())
        .await?
        .into_iter()
        .filter(|p| {
            compatibility::is_part_compatible(
                &rules,
                &engine_subject,
                &p.subject(),
                direct_fit.contains(&p.id),
            )
        })
        .collect();

    Ok(Json(DataResponse { data: parts }))
}

/// GET /api/v1/compatibility/engines/{id}/mappings
///
/// Direct fit mappings recorded for an engine.
pub async fn engine_mappings(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<EnginePartMapping>>>> {
    ensure_engine_exists(&state.pool, id).await?;
    let mappings = EnginePartCompatibilityRepo::list_for_engine(&state.pool, id).await?;
    Ok(Json(DataResponse { data: mappings }))
}
