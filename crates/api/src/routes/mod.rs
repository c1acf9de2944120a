pub mod bulk_operations;
pub mod compatibility;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /compatibility/rules                              list active rules (public)
/// /compatibility/check                              evaluate a selection (POST, public)
/// /compatibility/builds/{id}                        evaluate a saved build (public)
/// /compatibility/engines/{id}/parts                 compatible parts (public)
/// /compatibility/engines/{id}/mappings              direct fit mappings (public)
///
/// /admin/compatibility/rules                        list, create (admin only)
/// /admin/compatibility/rules/{id}                   update, deactivate
/// /admin/compatibility/rules/{id}/toggle            set active flag (POST)
/// /admin/compatibility/mappings                     upsert mapping (PUT)
/// /admin/compatibility/mappings/{engine_id}/{part_id} remove mapping (DELETE)
///
/// /admin/bulk-operations                            list, create (admin only)
/// /admin/bulk-operations/preview                    preview (POST)
/// /admin/bulk-operations/{id}                       get
/// /admin/bulk-operations/{id}/execute               run now (POST)
/// /admin/bulk-operations/{id}/cancel                cancel pending (POST)
/// /admin/bulk-operations/{id}/undo                  undo completed (POST)
/// /admin/bulk-operations/templates                  list, create
/// /admin/bulk-operations/templates/{id}             get, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/compatibility", compatibility::router())
        .nest("/admin/compatibility", compatibility::admin_router())
        .nest("/admin/bulk-operations", bulk_operations::router())
}
