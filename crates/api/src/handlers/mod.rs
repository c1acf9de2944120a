pub mod admin_compatibility;
pub mod bulk_operations;
pub mod compatibility;
