//! Route definitions for bulk operations.
//!
//! Mounted at `/admin/bulk-operations`.
//!
//! ```text
//! POST   /preview                 preview
//! GET    /                        list_operations
//! POST   /                        create_operation
//! GET    /templates               list_templates
//! POST   /templates               create_template
//! GET    /templates/{id}          get_template
//! DELETE /templates/{id}          delete_template
//! GET    /{id}                    get_operation
//! POST   /{id}/execute            execute_operation
//! POST   /{id}/cancel             cancel_operation
//! POST   /{id}/undo               undo_operation
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::bulk_operations;
use crate::state::AppState;

/// Bulk operation routes -- mounted at `/admin/bulk-operations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/preview", post(bulk_operations::preview))
        .route(
            "/",
            get(bulk_operations::list_operations).post(bulk_operations::create_operation),
        )
        .route(
            "/templates",
            get(bulk_operations::list_templates).post(bulk_operations::create_template),
        )
        .route(
            "/templates/{id}",
            get(bulk_operations::get_template).delete(bulk_operations::delete_template),
        )
        .route("/{id}", get(bulk_operations::get_operation))
        .route("/{id}/execute", post(bulk_operations::execute_operation))
        .route("/{id}/cancel", post(bulk_operations::cancel_operation))
        .route("/{id}/undo", post(bulk_operations::undo_operation))
}
