//! Preview, execute, cancel and undo for bulk operations.
//!
//! Used by the admin handlers and by the background sweeper that runs
//! scheduled operations.

use kartparts_core::bulk::{
    self, BulkEntityType, BulkFilter, BulkOperationType, BulkPreview, ErrorLogEntry, PreviewItem,
    MAX_AFFECTED_ROWS, PREVIEW_SAMPLE_SIZE,
};
use kartparts_core::error::CoreError;
use kartparts_core::types::{DbId, Timestamp};
use kartparts_db::models::bulk_operation::{BulkOperation, CreateBulkOperation};
use kartparts_db::repositories::{BulkOperationRepo, CatalogBulkRepo};
use serde_json::{Map, Value};
use sqlx::{Connection, PgPool};

use crate::error::{AppError, AppResult};

type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// A validated request to create a bulk operation.
#[derive(Debug, Clone)]
pub struct NewBulkOperation {
    pub name: String,
    pub description: Option<String>,
    pub entity_type: BulkEntityType,
    pub operation_type: BulkOperationType,
    pub filter: BulkFilter,
    pub changes: Map<String, Value>,
    pub scheduled_at: Option<Timestamp>,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "BulkOperation",
        id,
    })
}

fn lock_busy() -> AppError {
    AppError::Core(CoreError::Conflict(
        "Another bulk operation is in progress".to_string(),
    ))
}

fn too_many_rows(count: i64) -> AppError {
    AppError::Core(CoreError::Validation(format!(
        "Filter matches {count} items; at most {MAX_AFFECTED_ROWS} can be changed per operation"
    )))
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// Count and sample the rows an operation would touch. Writes nothing.
pub async fn preview(
    pool: &PgPool,
    entity: BulkEntityType,
    op_type: BulkOperationType,
    filter: &BulkFilter,
    changes: &Map<String, Value>,
) -> AppResult<BulkPreview> {
    bulk::validate_filter(entity, filter)?;
    let effective = bulk::effective_changes(entity, op_type, changes)?;

    let affected_count = CatalogBulkRepo::count_matching(pool, entity, filter).await?;
    let rows =
        CatalogBulkRepo::sample_matching(pool, entity, filter, PREVIEW_SAMPLE_SIZE).await?;

    let sample_items = rows
        .into_iter()
        .map(|row| PreviewItem {
            preview: bulk::preview_item(op_type, &row.data, &effective),
            id: row.id,
            name: row.name,
            current: row.data,
        })
        .collect();

    Ok(BulkPreview {
        affected_count,
        sample_items,
        warnings: bulk::preview_warnings(entity, op_type, filter, affected_count, &effective),
    })
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Record a new operation and, unless it is scheduled for later, run it.
///
/// The undo window is measured from `scheduled_at` when present, else from
/// `now`.
pub async fn create(
    pool: &PgPool,
    input: NewBulkOperation,
    created_by: Option<DbId>,
    retention_days: i64,
    now: Timestamp,
) -> AppResult<BulkOperation> {
    bulk::validate_filter(input.entity_type, &input.filter)?;
    let effective = bulk::effective_changes(input.entity_type, input.operation_type, &input.changes)?;

    let affected_count =
        CatalogBulkRepo::count_matching(pool, input.entity_type, &input.filter).await?;
    if affected_count > MAX_AFFECTED_ROWS {
        return Err(too_many_rows(affected_count));
    }

    let filter = serde_json::to_value(&input.filter)
        .map_err(|e| AppError::InternalError(format!("Failed to encode filter: {e}")))?;

    let record = CreateBulkOperation {
        name: input.name,
        description: input.description,
        entity_type: input.entity_type,
        operation_type: input.operation_type,
        filter,
        changes: Value::Object(effective),
        affected_count: affected_count as i32,
        scheduled_at: input.scheduled_at,
        expires_at: bulk::undo_expiry(input.scheduled_at.unwrap_or(now), retention_days),
        created_by,
    };

    if matches!(record.scheduled_at, Some(at) if at > now) {
        let op = BulkOperationRepo::create(pool, &record).await?;
        tracing::info!(
            id = op.id,
            entity_type = %op.entity_type,
            operation_type = %op.operation_type,
            affected_count,
            scheduled = true,
            "Bulk operation created"
        );
        return Ok(op);
    }

    // Immediate operations are only recorded once the bulk lock is held.
    let mut tx = pool.begin().await?;
    if !BulkOperationRepo::try_lock(&mut tx).await? {
        return Err(lock_busy());
    }

    let op = BulkOperationRepo::create(&mut *tx, &record).await?;
    tracing::info!(
        id = op.id,
        entity_type = %op.entity_type,
        operation_type = %op.operation_type,
        affected_count,
        scheduled = false,
        "Bulk operation created"
    );

    let id = op.id;
    let op = BulkOperationRepo::claim(&mut tx, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    run_claimed(tx, op).await
}

// ---------------------------------------------------------------------------
// Execute
// ---------------------------------------------------------------------------

/// Run a pending operation.
///
/// The catalog change and the `completed` transition commit together. If
/// applying fails, the change is rolled back and the operation is recorded
/// as `failed` with the error in `error_log`. The failed record is returned.
/// If another operation holds the bulk lock, this returns a conflict and the
/// operation stays `pending`.
pub async fn execute(pool: &PgPool, id: DbId) -> AppResult<BulkOperation> {
    let mut tx = pool.begin().await?;

    if !BulkOperationRepo::try_lock(&mut tx).await? {
        return Err(lock_busy());
    }

    let Some(op) = BulkOperationRepo::claim(&mut tx, id).await? else {
        drop(tx);
        let existing = BulkOperationRepo::find_by_id(pool, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Operation is {} and cannot be executed",
            existing.status
        ))));
    };

    run_claimed(tx, op).await
}

/// Apply a claimed operation and commit the outcome.
///
/// The catalog change runs inside a savepoint. On failure only the savepoint
/// is rolled back, and the `failed` transition commits under the same bulk
/// lock that claimed the operation.
async fn run_claimed(mut tx: Tx<'_>, op: BulkOperation) -> AppResult<BulkOperation> {
    let id = op.id;
    let mut savepoint = Connection::begin(&mut *tx).await?;

    match apply(&mut savepoint, &op).await {
        Ok(done) => {
            savepoint.commit().await?;
            tx.commit().await?;
            tracing::info!(
                id,
                affected_count = done.affected_count,
                completed_count = done.completed_count,
                "Bulk operation completed"
            );
            Ok(done)
        }
        Err(e) => {
            savepoint.rollback().await?;
            tracing::warn!(id, error = %e, "Bulk operation failed, changes rolled back");
            let error_log = serde_json::to_value(vec![ErrorLogEntry {
                id: None,
                error: e.to_string(),
            }])
            .map_err(|e| AppError::InternalError(format!("Failed to encode error log: {e}")))?;
            let failed = BulkOperationRepo::mark_failed(&mut tx, id, &error_log)
                .await?
                .ok_or_else(|| not_found(id))?;
            tx.commit().await?;
            Ok(failed)
        }
    }
}

/// Lock, snapshot and change the matching rows, then mark `op` completed.
async fn apply(tx: &mut Tx<'_>, op: &BulkOperation) -> AppResult<BulkOperation> {
    let entity = op.entity()?;
    let op_type = op.op_type()?;
    let filter = op.bulk_filter()?;
    let changes = bulk::effective_changes(entity, op_type, &op.change_map()?)?;
    let fields = bulk::restorable_fields(entity, op_type, &changes)?;

    let ids = CatalogBulkRepo::lock_matching(tx, entity, &filter, MAX_AFFECTED_ROWS + 1).await?;
    if ids.len() as i64 > MAX_AFFECTED_ROWS {
        return Err(too_many_rows(ids.len() as i64));
    }

    let snapshot = CatalogBulkRepo::snapshot(tx, entity, &ids).await?;
    let snapshot = serde_json::to_value(&snapshot)
        .map_err(|e| AppError::InternalError(format!("Failed to encode snapshot: {e}")))?;

    let changed = match op_type {
        BulkOperationType::Delete => CatalogBulkRepo::soft_delete_rows(tx, entity, &ids).await?,
        _ => CatalogBulkRepo::apply_changes(tx, entity, &ids, &fields, &changes).await?,
    };

    Ok(BulkOperationRepo::complete(tx, op.id, &ids, changed as i32, &snapshot).await?)
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// Cancel a pending operation.
pub async fn cancel(pool: &PgPool, id: DbId) -> AppResult<BulkOperation> {
    if let Some(cancelled) = BulkOperationRepo::cancel(pool, id).await? {
        tracing::info!(id, "Bulk operation cancelled");
        return Ok(cancelled);
    }

    let existing = BulkOperationRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    if bulk::can_cancel(existing.status()?) {
        // Claimed between the update and this read.
        return Err(lock_busy());
    }
    Err(AppError::Core(CoreError::Conflict(format!(
        "Only pending operations can be cancelled; this one is {}",
        existing.status
    ))))
}

// ---------------------------------------------------------------------------
// Undo
// ---------------------------------------------------------------------------

/// Restore every row touched by a completed operation to its captured state.
///
/// Only the columns the operation wrote are rewritten. Closes the undo
/// window on success.
pub async fn undo(pool: &PgPool, id: DbId, now: Timestamp) -> AppResult<BulkOperation> {
    let mut tx = pool.begin().await?;

    if !BulkOperationRepo::try_lock(&mut tx).await? {
        return Err(lock_busy());
    }

    let op = BulkOperationRepo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let entries = op.snapshot_entries()?;
    bulk::check_undo(op.status()?, op.can_undo, op.expires_at, now, entries.is_some())?;
    let entries = entries.unwrap_or_default();

    let entity = op.entity()?;
    let fields = bulk::restorable_fields(entity, op.op_type()?, &op.change_map()?)?;
    let restored = CatalogBulkRepo::restore_fields(&mut tx, entity, &entries, &fields).await?;

    let undone = BulkOperationRepo::mark_undone(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(id, restored, "Bulk operation undone");
    Ok(undone)
}
