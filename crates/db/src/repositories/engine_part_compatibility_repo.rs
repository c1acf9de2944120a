//! Repository for the `engine_part_compatibility` table.

use kartparts_core::types::DbId;
use sqlx::PgPool;

use crate::models::engine_part_compatibility::{
    EnginePartCompatibility, EnginePartMapping, UpsertEnginePartCompatibility,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, engine_id, part_id, compatibility_level, notes, created_at, updated_at";

/// Provides CRUD operations for direct engine/part mappings.
pub struct EnginePartCompatibilityRepo;

impl EnginePartCompatibilityRepo {
    /// Create or replace the mapping for one engine/part pair.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertEnginePartCompatibility,
    ) -> Result<EnginePartCompatibility, sqlx::Error> {
        let query = format!(
            "INSERT INTO engine_part_compatibility (engine_id, part_id, compatibility_level, notes) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT uq_engine_part_compatibility_pair DO UPDATE SET \
                compatibility_level = EXCLUDED.compatibility_level, \
                notes = EXCLUDED.notes \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EnginePartCompatibility>(&query)
            .bind(input.engine_id)
            .bind(input.part_id)
            .bind(&input.compatibility_level)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    /// Remove the mapping for a pair. Returns `true` if a row was removed.
    pub async fn delete(
        pool: &PgPool,
        engine_id: DbId,
        part_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM engine_part_compatibility WHERE engine_id = $1 AND part_id = $2",
        )
        .bind(engine_id)
        .bind(part_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mappings for an engine joined with their (non-deleted) parts,
    /// ordered by category then part name.
    pub async fn list_for_engine(
        pool: &PgPool,
        engine_id: DbId,
    ) -> Result<Vec<EnginePartMapping>, sqlx::Error> {
        sqlx::query_as::<_, EnginePartMapping>(
            "SELECT epc.part_id, p.name AS part_name, p.category AS part_category, \
                    epc.compatibility_level, epc.notes \
             FROM engine_part_compatibility epc \
             JOIN parts p ON p.id = epc.part_id \
             WHERE epc.engine_id = $1 AND p.deleted_at IS NULL \
             ORDER BY p.category, p.name",
        )
        .bind(engine_id)
        .fetch_all(pool)
        .await
    }

    /// Mappings between one engine and any of the given parts.
    pub async fn find_for_parts(
        pool: &PgPool,
        engine_id: DbId,
        part_ids: &[DbId],
    ) -> Result<Vec<EnginePartCompatibility>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM engine_part_compatibility \
             WHERE engine_id = $1 AND part_id = ANY($2)"
        );
        sqlx::query_as::<_, EnginePartCompatibility>(&query)
            .bind(engine_id)
            .bind(part_ids)
            .fetch_all(pool)
            .await
    }
}
