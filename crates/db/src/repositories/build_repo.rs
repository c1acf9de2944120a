//! Repository for the `builds` table.

use kartparts_core::types::DbId;
use sqlx::PgPool;

use crate::models::build::{Build, CreateBuild};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, engine_id, parts, total_price, is_public, \
    is_active, created_by, created_at, updated_at";

/// Provides read access to builds, plus inserts for seeding.
pub struct BuildRepo;

impl BuildRepo {
    /// Insert a new build, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateBuild) -> Result<Build, sqlx::Error> {
        let query = format!(
            "INSERT INTO builds (name, description, engine_id, parts, total_price, is_public, \
                 created_by) \
             VALUES ($1, $2, $3, $4, COALESCE($5, 0), COALESCE($6, false), $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Build>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.engine_id)
            .bind(&input.parts)
            .bind(input.total_price)
            .bind(input.is_public)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a build by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Build>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM builds WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Build>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
