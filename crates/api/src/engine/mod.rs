//! Bulk operation engine.
//!
//! Previews, executes, cancels and undoes bulk operations against the
//! catalog. Execution and undo each run in a single transaction guarded by
//! a Postgres advisory lock.

pub mod bulk;
