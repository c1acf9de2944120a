//! Dynamic SQL for bulk operations over `engines`, `parts`, and `builds`.
//!
//! Table and column names come only from the static registries in
//! `kartparts_core::bulk`; user input is always bound. Mutating methods run
//! inside a caller-owned transaction.

use kartparts_core::bulk::{like_pattern, BulkEntityType, BulkFilter, SnapshotEntry};
use kartparts_core::types::DbId;
use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::models::catalog_row::CatalogRow;

type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// A bound filter value, in placeholder order.
enum FilterArg {
    Ids(Vec<DbId>),
    Bool(bool),
    Text(String),
}

/// Bind filter arguments onto any sqlx query builder in order.
macro_rules! bind_filter_args {
    ($query:expr, $args:expr) => {{
        let mut query = $query;
        for arg in $args {
            query = match arg {
                FilterArg::Ids(v) => query.bind(v),
                FilterArg::Bool(v) => query.bind(v),
                FilterArg::Text(v) => query.bind(v),
            };
        }
        query
    }};
}

/// Build the `WHERE` body for `filter` against alias `t`, numbering
/// placeholders from `$1`. Soft-deleted rows never match.
fn filter_clause(entity: BulkEntityType, filter: &BulkFilter) -> (String, Vec<FilterArg>) {
    let mut conditions = vec!["t.deleted_at IS NULL".to_string()];
    let mut args = Vec::new();
    let mut param_idx = 1usize;

    if let Some(ids) = &filter.ids {
        conditions.push(format!("t.id = ANY(${param_idx})"));
        args.push(FilterArg::Ids(ids.clone()));
        param_idx += 1;
    }
    if let Some(is_active) = filter.is_active {
        conditions.push(format!("t.is_active = ${param_idx}"));
        args.push(FilterArg::Bool(is_active));
        param_idx += 1;
    }
    if let Some(brand) = filter.brand.as_deref().filter(|_| entity.has_brand()) {
        conditions.push(format!("t.brand = ${param_idx}"));
        args.push(FilterArg::Text(brand.trim().to_string()));
        param_idx += 1;
    }
    if let Some(category) = filter
        .category
        .as_deref()
        .filter(|_| entity == BulkEntityType::Part)
    {
        conditions.push(format!("t.category = ${param_idx}"));
        args.push(FilterArg::Text(category.to_string()));
        param_idx += 1;
    }
    if let Some(search) = &filter.search {
        conditions.push(format!("t.name ILIKE ${param_idx}"));
        args.push(FilterArg::Text(like_pattern(search)));
    }

    (conditions.join(" AND "), args)
}

/// `col = r.col, ...` for an `UPDATE ... FROM jsonb_populate_record(...) r`.
fn set_from_record(fields: &[&'static str]) -> String {
    fields
        .iter()
        .map(|f| format!("{f} = r.{f}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Filter, snapshot, apply, and restore primitives for bulk operations.
pub struct CatalogBulkRepo;

impl CatalogBulkRepo {
    /// Count rows matching `filter`.
    pub async fn count_matching(
        pool: &PgPool,
        entity: BulkEntityType,
        filter: &BulkFilter,
    ) -> Result<i64, sqlx::Error> {
        let (clause, args) = filter_clause(entity, filter);
        let query = format!(
            "SELECT COUNT(*) FROM {table} t WHERE {clause}",
            table = entity.table_name()
        );
        bind_filter_args!(sqlx::query_scalar::<_, i64>(&query), args)
            .fetch_one(pool)
            .await
    }

    /// First `limit` matching rows by ID, as JSON.
    pub async fn sample_matching(
        pool: &PgPool,
        entity: BulkEntityType,
        filter: &BulkFilter,
        limit: i64,
    ) -> Result<Vec<CatalogRow>, sqlx::Error> {
        let (clause, args) = filter_clause(entity, filter);
        let query = format!(
            "SELECT t.id, t.name, to_jsonb(t) - 'deleted_at' AS data \
             FROM {table} t WHERE {clause} \
             ORDER BY t.id LIMIT {limit}",
            table = entity.table_name()
        );
        bind_filter_args!(sqlx::query_as::<_, CatalogRow>(&query), args)
            .fetch_all(pool)
            .await
    }

    /// Lock up to `limit` matching rows (`FOR UPDATE`) and return their IDs.
    pub async fn lock_matching(
        tx: &mut Tx<'_>,
        entity: BulkEntityType,
        filter: &BulkFilter,
        limit: i64,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let (clause, args) = filter_clause(entity, filter);
        let query = format!(
            "SELECT t.id FROM {table} t WHERE {clause} \
             ORDER BY t.id LIMIT {limit} FOR UPDATE",
            table = entity.table_name()
        );
        bind_filter_args!(sqlx::query_scalar::<_, DbId>(&query), args)
            .fetch_all(&mut **tx)
            .await
    }

    /// Full current state of the given rows.
    pub async fn snapshot(
        tx: &mut Tx<'_>,
        entity: BulkEntityType,
        ids: &[DbId],
    ) -> Result<Vec<SnapshotEntry>, sqlx::Error> {
        let query = format!(
            "SELECT t.id, to_jsonb(t) FROM {table} t WHERE t.id = ANY($1) ORDER BY t.id",
            table = entity.table_name()
        );
        let rows = sqlx::query_as::<_, (DbId, Value)>(&query)
            .bind(ids)
            .fetch_all(&mut **tx)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, data)| SnapshotEntry { id, data })
            .collect())
    }

    /// Write `changes` to `fields` on every row in `ids`.
    ///
    /// `fields` must be the validated keys of `changes`.
    pub async fn apply_changes(
        tx: &mut Tx<'_>,
        entity: BulkEntityType,
        ids: &[DbId],
        fields: &[&'static str],
        changes: &Map<String, Value>,
    ) -> Result<u64, sqlx::Error> {
        if fields.is_empty() || ids.is_empty() {
            return Ok(0);
        }
        let table = entity.table_name();
        let query = format!(
            "UPDATE {table} AS t SET {sets} \
             FROM jsonb_populate_record(NULL::{table}, $2) AS r \
             WHERE t.id = ANY($1)",
            sets = set_from_record(fields)
        );
        let result = sqlx::query(&query)
            .bind(ids)
            .bind(Value::Object(changes.clone()))
            .execute(&mut **tx)
            .await?;
        tracing::debug!(table, ?fields, rows = result.rows_affected(), "Bulk changes applied");
        Ok(result.rows_affected())
    }

    /// Soft-delete every row in `ids`.
    pub async fn soft_delete_rows(
        tx: &mut Tx<'_>,
        entity: BulkEntityType,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "UPDATE {table} SET deleted_at = NOW() WHERE id = ANY($1) AND deleted_at IS NULL",
            table = entity.table_name()
        );
        let result = sqlx::query(&query)
            .bind(ids)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Rewrite `fields` on each snapshotted row from its captured state.
    pub async fn restore_fields(
        tx: &mut Tx<'_>,
        entity: BulkEntityType,
        entries: &[SnapshotEntry],
        fields: &[&'static str],
    ) -> Result<u64, sqlx::Error> {
        if fields.is_empty() || entries.is_empty() {
            return Ok(0);
        }
        let table = entity.table_name();
        let query = format!(
            "UPDATE {table} AS t SET {sets} \
             FROM jsonb_populate_recordset(NULL::{table}, $1) AS r \
             WHERE t.id = r.id",
            sets = set_from_record(fields)
        );
        let records = Value::Array(entries.iter().map(|e| e.data.clone()).collect());
        let result = sqlx::query(&query)
            .bind(records)
            .execute(&mut **tx)
            .await?;
        tracing::debug!(table, ?fields, rows = result.rows_affected(), "Bulk snapshot restored");
        Ok(result.rows_affected())
    }
}
