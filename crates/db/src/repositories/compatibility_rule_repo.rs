//! Repository for the `compatibility_rules` table.

use kartparts_core::types::DbId;
use sqlx::PgPool;

use crate::models::compatibility_rule::{
    CompatibilityRuleFilter, CompatibilityRuleRow, CreateCompatibilityRule,
    UpdateCompatibilityRule,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, rule_type, source_category, target_category, condition, \
    warning_message, severity, is_active, created_by, created_at, updated_at";

/// Provides CRUD operations for compatibility rules.
pub struct CompatibilityRuleRepo;

impl CompatibilityRuleRepo {
    /// List rules matching every present criterion, ordered by rule type,
    /// source category, then severity.
    pub async fn list(
        pool: &PgPool,
        filter: &CompatibilityRuleFilter,
    ) -> Result<Vec<CompatibilityRuleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM compatibility_rules \
             WHERE ($1::TEXT IS NULL OR rule_type = $1) \
               AND ($2::TEXT IS NULL OR source_category = $2) \
               AND ($3::TEXT IS NULL OR target_category = $3) \
               AND ($4::BOOLEAN IS NULL OR is_active = $4) \
             ORDER BY rule_type, source_category, severity, id"
        );
        sqlx::query_as::<_, CompatibilityRuleRow>(&query)
            .bind(&filter.rule_type)
            .bind(&filter.source_category)
            .bind(&filter.target_category)
            .bind(filter.is_active)
            .fetch_all(pool)
            .await
    }

    /// Load every active rule, for evaluation.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<CompatibilityRuleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM compatibility_rules WHERE is_active = true ORDER BY id"
        );
        sqlx::query_as::<_, CompatibilityRuleRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Find a rule by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CompatibilityRuleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM compatibility_rules WHERE id = $1");
        sqlx::query_as::<_, CompatibilityRuleRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new rule, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateCompatibilityRule,
    ) -> Result<CompatibilityRuleRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO compatibility_rules \
                (rule_type, source_category, target_category, condition, warning_message, \
                 severity, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, true), $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CompatibilityRuleRow>(&query)
            .bind(&input.rule_type)
            .bind(&input.source_category)
            .bind(&input.target_category)
            .bind(&input.condition)
            .bind(&input.warning_message)
            .bind(&input.severity)
            .bind(input.is_active)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Update a rule. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCompatibilityRule,
    ) -> Result<Option<CompatibilityRuleRow>, sqlx::Error> {
        let query = format!(
            "UPDATE compatibility_rules SET \
                rule_type = COALESCE($2, rule_type), \
                source_category = COALESCE($3, source_category), \
                target_category = COALESCE($4, target_category), \
                condition = COALESCE($5, condition), \
                warning_message = COALESCE($6, warning_message), \
                severity = COALESCE($7, severity), \
                is_active = COALESCE($8, is_active) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CompatibilityRuleRow>(&query)
            .bind(id)
            .bind(&input.rule_type)
            .bind(&input.source_category)
            .bind(&input.target_category)
            .bind(&input.condition)
            .bind(&input.warning_message)
            .bind(&input.severity)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Set `is_active`. Deleting a rule is `set_active(.., false)`.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn set_active(
        pool: &PgPool,
        id: DbId,
        is_active: bool,
    ) -> Result<Option<CompatibilityRuleRow>, sqlx::Error> {
        let query = format!(
            "UPDATE compatibility_rules SET is_active = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CompatibilityRuleRow>(&query)
            .bind(id)
            .bind(is_active)
            .fetch_optional(pool)
            .await
    }
}
