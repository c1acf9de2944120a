//! Admin handlers for bulk operations and bulk operation templates.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

use kartparts_core::bulk::{
    self, BulkEntityType, BulkFilter, BulkOperationStatus, BulkOperationType, BulkPreview,
};
use kartparts_core::error::CoreError;
use kartparts_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use kartparts_core::types::{DbId, Timestamp};
use kartparts_db::models::bulk_operation::{BulkOperation, BulkOperationListFilter};
use kartparts_db::models::bulk_operation_template::{
    BulkOperationTemplate, CreateBulkOperationTemplate,
};
use kartparts_db::repositories::{BulkOperationRepo, BulkOperationTemplateRepo};
use sqlx::PgPool;

use crate::engine::bulk as engine;
use crate::engine::bulk::NewBulkOperation;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body for `POST /admin/bulk-operations/preview`.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub entity_type: String,
    pub operation_type: String,
    #[serde(default)]
    pub filter: BulkFilter,
    #[serde(default)]
    pub changes: Map<String, Value>,
}

/// Body for `POST /admin/bulk-operations`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBulkOperationRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub entity_type: String,
    pub operation_type: String,
    #[serde(default)]
    pub filter: BulkFilter,
    #[serde(default)]
    pub changes: Map<String, Value>,
    pub scheduled_at: Option<Timestamp>,
}

/// Query parameters for `GET /admin/bulk-operations`.
#[derive(Debug, Deserialize)]
pub struct ListBulkOperationsParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<String>,
    pub entity_type: Option<String>,
}

/// Body for `POST /admin/bulk-operations/templates`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub entity_type: String,
    pub operation_type: String,
    #[serde(default)]
    pub filter: BulkFilter,
    #[serde(default)]
    pub changes: Map<String, Value>,
    #[serde(default)]
    pub is_public: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_kind(
    entity_type: &str,
    operation_type: &str,
) -> AppResult<(BulkEntityType, BulkOperationType)> {
    Ok((
        BulkEntityType::parse(entity_type)?,
        BulkOperationType::parse(operation_type)?,
    ))
}

async fn ensure_operation_exists(pool: &PgPool, id: DbId) -> AppResult<BulkOperation> {
    BulkOperationRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "BulkOperation",
            id,
        }))
}

/// A template the user may see: public or their own. Others read as missing.
async fn ensure_template_visible(
    pool: &PgPool,
    id: DbId,
    user: &AuthUser,
) -> AppResult<BulkOperationTemplate> {
    BulkOperationTemplateRepo::find_by_id(pool, id)
        .await?
        .filter(|t| t.is_public || t.created_by == Some(user.user_id))
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "BulkOperationTemplate",
            id,
        }))
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/bulk-operations/preview
///
/// Count the affected rows and show a sample before and after. Nothing is
/// recorded.
pub async fn preview(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<PreviewRequest>,
) -> AppResult<Json<DataResponse<BulkPreview>>> {
    let (entity, op_type) = parse_kind(&input.entity_type, &input.operation_type)?;
    let preview =
        engine::preview(&state.pool, entity, op_type, &input.filter, &input.changes).await?;
    Ok(Json(DataResponse { data: preview }))
}

/// POST /api/v1/admin/bulk-operations
///
/// Record an operation. It runs immediately unless `scheduled_at` is in the
/// future, in which case the sweeper picks it up.
pub async fn create_operation(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateBulkOperationRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let (entity_type, operation_type) = parse_kind(&input.entity_type, &input.operation_type)?;

    let op = engine::create(
        &state.pool,
        NewBulkOperation {
            name: input.name,
            description: input.description,
            entity_type,
            operation_type,
            filter: input.filter,
            changes: input.changes,
            scheduled_at: input.scheduled_at,
        },
        Some(admin.user_id),
        state.config.bulk_undo_retention_days,
        Utc::now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: op })))
}

/// GET /api/v1/admin/bulk-operations
///
/// List operations newest first, with optional `status` and `entity_type`.
pub async fn list_operations(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListBulkOperationsParams>,
) -> AppResult<Json<DataResponse<Vec<BulkOperation>>>> {
    if let Some(status) = params.status.as_deref() {
        BulkOperationStatus::parse(status)?;
    }
    if let Some(entity_type) = params.entity_type.as_deref() {
        BulkEntityType::parse(entity_type)?;
    }

    let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(params.offset);
    let filter = BulkOperationListFilter {
        status: params.status,
        entity_type: params.entity_type,
    };

    let ops = BulkOperationRepo::list(&state.pool, &filter, limit, offset).await?;
    Ok(Json(DataResponse { data: ops }))
}

/// GET /api/v1/admin/bulk-operations/{id}
pub async fn get_operation(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BulkOperation>>> {
    let op = ensure_operation_exists(&state.pool, id).await?;
    Ok(Json(DataResponse { data: op }))
}

/// POST /api/v1/admin/bulk-operations/{id}/execute
///
/// Run a pending operation now, ahead of its schedule.
pub async fn execute_operation(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BulkOperation>>> {
    let existing = ensure_operation_exists(&state.pool, id).await?;
    if !bulk::can_execute(existing.status()?) {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Operation is {} and cannot be executed",
            existing.status
        ))));
    }

    tracing::info!(id, user_id = admin.user_id, "Bulk operation execution requested");
    let op = engine::execute(&state.pool, id).await?;
    Ok(Json(DataResponse { data: op }))
}

/// POST /api/v1/admin/bulk-operations/{id}/cancel
pub async fn cancel_operation(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BulkOperation>>> {
    let op = engine::cancel(&state.pool, id).await?;
    Ok(Json(DataResponse { data: op }))
}

/// POST /api/v1/admin/bulk-operations/{id}/undo
///
/// Restore the rows a completed operation changed, within its undo window.
pub async fn undo_operation(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BulkOperation>>> {
    tracing::info!(id, user_id = admin.user_id, "Bulk operation undo requested");
    let op = engine::undo(&state.pool, id, Utc::now()).await?;
    Ok(Json(DataResponse { data: op }))
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/bulk-operations/templates
///
/// Public templates plus the caller's own.
pub async fn list_templates(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<BulkOperationTemplate>>>> {
    let templates = BulkOperationTemplateRepo::list_visible(&state.pool, admin.user_id).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// POST /api/v1/admin/bulk-operations/templates
///
/// Save a reusable operation. The filter and changes are validated the same
/// way as for a real operation.
pub async fn create_template(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateTemplateRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let (entity, op_type) = parse_kind(&input.entity_type, &input.operation_type)?;
    bulk::validate_filter(entity, &input.filter)?;
    let changes = bulk::effective_changes(entity, op_type, &input.changes)?;

    let filter = serde_json::to_value(&input.filter)
        .map_err(|e| AppError::InternalError(format!("Failed to encode filter: {e}")))?;

    let template = BulkOperationTemplateRepo::create(
        &state.pool,
        &CreateBulkOperationTemplate {
            name: input.name,
            description: input.description,
            entity_type: entity.as_str().to_string(),
            operation_type: op_type.as_str().to_string(),
            filter,
            changes: Value::Object(changes),
            is_public: input.is_public,
            created_by: Some(admin.user_id),
        },
    )
    .await?;

    tracing::info!(
        id = template.id,
        name = %template.name,
        user_id = admin.user_id,
        "Bulk operation template created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// GET /api/v1/admin/bulk-operations/templates/{id}
pub async fn get_template(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BulkOperationTemplate>>> {
    let template = ensure_template_visible(&state.pool, id, &admin).await?;
    Ok(Json(DataResponse { data: template }))
}

/// DELETE /api/v1/admin/bulk-operations/templates/{id}
///
/// Only the template's creator may delete it.
pub async fn delete_template(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let template = ensure_template_visible(&state.pool, id, &admin).await?;
    if template.created_by != Some(admin.user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the creator can delete this template".into(),
        )));
    }

    BulkOperationTemplateRepo::delete(&state.pool, id).await?;
    tracing::info!(id, user_id = admin.user_id, "Bulk operation template deleted");
    Ok(StatusCode::NO_CONTENT)
}
