//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches, where
//!   the table is edited in place

pub mod build;
pub mod bulk_operation;
pub mod bulk_operation_template;
pub mod catalog_row;
pub mod compatibility_rule;
pub mod engine;
pub mod engine_part_compatibility;
pub mod part;
