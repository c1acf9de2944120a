//! Domain logic for the kart parts catalog: compatibility rule evaluation
//! and the bulk-operation engine. Nothing in this crate touches the database.

pub mod bulk;
pub mod catalog;
pub mod compatibility;
pub mod error;
pub mod pagination;
pub mod roles;
pub mod types;
