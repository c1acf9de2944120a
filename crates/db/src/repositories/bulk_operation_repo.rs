//! Repository for the `bulk_operations` table.

use kartparts_core::bulk::BULK_LOCK_ID;
use kartparts_core::types::{DbId, Timestamp};
use sqlx::{PgExecutor, PgPool};

use crate::models::bulk_operation::{BulkOperation, BulkOperationListFilter, CreateBulkOperation};

type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, entity_type, operation_type, filter, changes, \
    affected_ids, affected_count, completed_count, failed_count, error_log, snapshot, status, \
    scheduled_at, started_at, completed_at, undone_at, can_undo, expires_at, created_by, \
    created_at, updated_at";

/// Provides CRUD and lifecycle transitions for bulk operations.
pub struct BulkOperationRepo;

impl BulkOperationRepo {
    /// Insert a new pending operation, returning the created row.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateBulkOperation,
    ) -> Result<BulkOperation, sqlx::Error> {
        let query = format!(
            "INSERT INTO bulk_operations \
                (name, description, entity_type, operation_type, filter, changes, \
                 affected_count, scheduled_at, expires_at, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BulkOperation>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.entity_type.as_str())
            .bind(input.operation_type.as_str())
            .bind(&input.filter)
            .bind(&input.changes)
            .bind(input.affected_count)
            .bind(input.scheduled_at)
            .bind(input.expires_at)
            .bind(input.created_by)
            .fetch_one(executor)
            .await
    }

    /// Find a single operation by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<BulkOperation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bulk_operations WHERE id = $1");
        sqlx::query_as::<_, BulkOperation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List operations newest first, optionally filtered by status and
    /// entity type.
    pub async fn list(
        pool: &PgPool,
        filter: &BulkOperationListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BulkOperation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bulk_operations \
             WHERE ($1::TEXT IS NULL OR status = $1) \
               AND ($2::TEXT IS NULL OR entity_type = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, BulkOperation>(&query)
            .bind(&filter.status)
            .bind(&filter.entity_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Transactional transitions
    // -----------------------------------------------------------------------

    /// Take the bulk-operation advisory lock for the rest of the
    /// transaction. Returns `false` if another transaction holds it.
    pub async fn try_lock(tx: &mut Tx<'_>) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_xact_lock($1)")
            .bind(BULK_LOCK_ID)
            .fetch_one(&mut **tx)
            .await
    }

    /// Move a pending operation to `running`. Returns `None` if the
    /// operation is missing or no longer pending.
    pub async fn claim(tx: &mut Tx<'_>, id: DbId) -> Result<Option<BulkOperation>, sqlx::Error> {
        let query = format!(
            "UPDATE bulk_operations SET status = 'running', started_at = NOW() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BulkOperation>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Record a successful execution.
    pub async fn complete(
        tx: &mut Tx<'_>,
        id: DbId,
        affected_ids: &[DbId],
        completed_count: i32,
        snapshot: &serde_json::Value,
    ) -> Result<BulkOperation, sqlx::Error> {
        let query = format!(
            "UPDATE bulk_operations SET \
                status = 'completed', \
                affected_ids = $2, \
                affected_count = $3, \
                completed_count = $4, \
                failed_count = 0, \
                snapshot = $5, \
                completed_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BulkOperation>(&query)
            .bind(id)
            .bind(affected_ids)
            .bind(affected_ids.len() as i32)
            .bind(completed_count)
            .bind(snapshot)
            .fetch_one(&mut **tx)
            .await
    }

    /// Lock an operation row for undo.
    pub async fn find_for_update(
        tx: &mut Tx<'_>,
        id: DbId,
    ) -> Result<Option<BulkOperation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bulk_operations WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, BulkOperation>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Close the undo window after a successful undo.
    pub async fn mark_undone(tx: &mut Tx<'_>, id: DbId) -> Result<BulkOperation, sqlx::Error> {
        let query = format!(
            "UPDATE bulk_operations SET can_undo = false, undone_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BulkOperation>(&query)
            .bind(id)
            .fetch_one(&mut **tx)
            .await
    }

    /// Record a failed execution. The catalog change has already been
    /// rolled back, so nothing is undoable. Returns `None` if the operation
    /// is missing or has already finished.
    pub async fn mark_failed(
        tx: &mut Tx<'_>,
        id: DbId,
        error_log: &serde_json::Value,
    ) -> Result<Option<BulkOperation>, sqlx::Error> {
        let query = format!(
            "UPDATE bulk_operations SET \
                status = 'failed', \
                started_at = COALESCE(started_at, NOW()), \
                completed_at = NOW(), \
                completed_count = 0, \
                failed_count = affected_count, \
                error_log = $2, \
                can_undo = false \
             WHERE id = $1 AND status IN ('pending', 'running') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BulkOperation>(&query)
            .bind(id)
            .bind(error_log)
            .fetch_optional(&mut **tx)
            .await
    }

    // -----------------------------------------------------------------------
    // Pool-level transitions
    // -----------------------------------------------------------------------

    /// Cancel a pending operation. Returns `None` if it is missing or no
    /// longer pending.
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<Option<BulkOperation>, sqlx::Error> {
        let query = format!(
            "UPDATE bulk_operations SET status = 'cancelled', can_undo = false \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BulkOperation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Revoke undo on operations whose window closed at or before `now`,
    /// releasing their snapshots. Returns the number of rows updated.
    pub async fn expire_undo_windows(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bulk_operations SET can_undo = false, snapshot = NULL \
             WHERE can_undo = true AND status = 'completed' AND expires_at <= $1",
        )
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// IDs of pending scheduled operations due at or before `now`, oldest
    /// first.
    pub async fn list_due(
        pool: &PgPool,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM bulk_operations \
             WHERE status = 'pending' AND scheduled_at IS NOT NULL AND scheduled_at <= $1 \
             ORDER BY scheduled_at, id \
             LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
