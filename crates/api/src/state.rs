use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: kartparts_db::DbPool,
    /// Server configuration (JWT settings, bulk undo retention).
    pub config: Arc<ServerConfig>,
}
