//! Repository for the `parts` table.

use kartparts_core::types::DbId;
use sqlx::PgPool;

use crate::models::part::{CreatePart, Part};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, slug, name, category, brand, specifications, price, is_active, \
    created_at, updated_at";

/// Provides read access to parts, plus inserts for seeding.
pub struct PartRepo;

impl PartRepo {
    /// Insert a new part, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreatePart) -> Result<Part, sqlx::Error> {
        let query = format!(
            "INSERT INTO parts (slug, name, category, brand, specifications, price) \
             VALUES ($1, $2, $3, $4, COALESCE($5, '{{}}'::jsonb), $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Part>(&query)
            .bind(&input.slug)
            .bind(&input.name)
            .bind(&input.category)
            .bind(&input.brand)
            .bind(&input.specifications)
            .bind(input.price)
            .fetch_one(pool)
            .await
    }

    /// Find a part by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Part>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM parts WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Part>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the given parts, ordered by ID. Unknown and soft-deleted IDs
    /// are silently dropped.
    pub async fn find_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Part>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM parts \
             WHERE id = ANY($1) AND deleted_at IS NULL \
             ORDER BY id"
        );
        sqlx::query_as::<_, Part>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// List active parts, optionally restricted to one category, ordered by
    /// category then name.
    pub async fn list_active(
        pool: &PgPool,
        category: Option<&str>,
    ) -> Result<Vec<Part>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM parts \
             WHERE is_active = true AND deleted_at IS NULL \
               AND ($1::TEXT IS NULL OR category = $1) \
             ORDER BY category, name"
        );
        sqlx::query_as::<_, Part>(&query)
            .bind(category)
            .fetch_all(pool)
            .await
    }
}
