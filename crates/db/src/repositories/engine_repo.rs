//! Repository for the `engines` table.

use kartparts_core::types::DbId;
use sqlx::PgPool;

use crate::models::engine::{CreateEngine, Engine};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, slug, name, brand, displacement_cc, horsepower, torque, \
    shaft_diameter, shaft_length, shaft_type, mount_type, weight_lbs, price, is_active, \
    created_at, updated_at";

/// Provides read access to engines, plus inserts for seeding.
pub struct EngineRepo;

impl EngineRepo {
    /// Insert a new engine, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateEngine) -> Result<Engine, sqlx::Error> {
        let query = format!(
            "INSERT INTO engines (slug, name, brand, displacement_cc, horsepower, torque, \
                 shaft_diameter, shaft_length, shaft_type, mount_type, weight_lbs, price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, 'straight'), $10, $11, $12) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Engine>(&query)
            .bind(&input.slug)
            .bind(&input.name)
            .bind(&input.brand)
            .bind(input.displacement_cc)
            .bind(input.horsepower)
            .bind(input.torque)
            .bind(input.shaft_diameter)
            .bind(input.shaft_length)
            .bind(&input.shaft_type)
            .bind(&input.mount_type)
            .bind(input.weight_lbs)
            .bind(input.price)
            .fetch_one(pool)
            .await
    }

    /// Find an engine by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Engine>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM engines WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Engine>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
