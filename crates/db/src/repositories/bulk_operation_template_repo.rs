//! Repository for the `bulk_operation_templates` table.

use kartparts_core::types::DbId;
use sqlx::PgPool;

use crate::models::bulk_operation_template::{
    BulkOperationTemplate, CreateBulkOperationTemplate,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, entity_type, operation_type, filter, changes, \
    is_public, created_by, created_at, updated_at";

/// Provides CRUD operations for bulk operation templates.
pub struct BulkOperationTemplateRepo;

impl BulkOperationTemplateRepo {
    /// Insert a new template, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateBulkOperationTemplate,
    ) -> Result<BulkOperationTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO bulk_operation_templates \
                (name, description, entity_type, operation_type, filter, changes, is_public, \
                 created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BulkOperationTemplate>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.entity_type)
            .bind(&input.operation_type)
            .bind(&input.filter)
            .bind(&input.changes)
            .bind(input.is_public)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Templates visible to `user_id`: public ones plus their own, by name.
    pub async fn list_visible(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<BulkOperationTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bulk_operation_templates \
             WHERE is_public = true OR created_by = $1 \
             ORDER BY name"
        );
        sqlx::query_as::<_, BulkOperationTemplate>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Find a template by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BulkOperationTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bulk_operation_templates WHERE id = $1");
        sqlx::query_as::<_, BulkOperationTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a template. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bulk_operation_templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
