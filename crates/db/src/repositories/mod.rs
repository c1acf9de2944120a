//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or a caller-owned transaction) as the first argument.

pub mod build_repo;
pub mod bulk_operation_repo;
pub mod bulk_operation_template_repo;
pub mod catalog_bulk_repo;
pub mod compatibility_rule_repo;
pub mod engine_part_compatibility_repo;
pub mod engine_repo;
pub mod part_repo;

pub use build_repo::BuildRepo;
pub use bulk_operation_repo::BulkOperationRepo;
pub use bulk_operation_template_repo::BulkOperationTemplateRepo;
pub use catalog_bulk_repo::CatalogBulkRepo;
pub use compatibility_rule_repo::CompatibilityRuleRepo;
pub use engine_part_compatibility_repo::EnginePartCompatibilityRepo;
pub use engine_repo::EngineRepo;
pub use part_repo::PartRepo;
