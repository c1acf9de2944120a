//! Route definitions for compatibility checks and rule administration.
//!
//! ```text
//! PUBLIC (mounted at /compatibility):
//! GET    /rules                          list_rules
//! POST   /check                          check
//! GET    /builds/{id}                    check_build
//! GET    /engines/{id}/parts             compatible_parts
//! GET    /engines/{id}/mappings          engine_mappings
//!
//! ADMIN (mounted at /admin/compatibility):
//! GET    /rules                          list_rules
//! POST   /rules                          create_rule
//! PUT    /rules/{id}                     update_rule
//! DELETE /rules/{id}                     delete_rule
//! POST   /rules/{id}/toggle              toggle_rule
//! PUT    /mappings                       upsert_mapping
//! DELETE /mappings/{engine_id}/{part_id} delete_mapping
//! ```

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{admin_compatibility, compatibility};
use crate::state::AppState;

/// Public compatibility routes -- mounted at `/compatibility`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rules", get(compatibility::list_rules))
        .route("/check", post(compatibility::check))
        .route("/builds/{id}", get(compatibility::check_build))
        .route("/engines/{id}/parts", get(compatibility::compatible_parts))
        .route("/engines/{id}/mappings", get(compatibility::engine_mappings))
}

/// Admin compatibility routes -- mounted at `/admin/compatibility`.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/rules",
            get(admin_compatibility::list_rules).post(admin_compatibility::create_rule),
        )
        .route(
            "/rules/{id}",
            put(admin_compatibility::update_rule).delete(admin_compatibility::delete_rule),
        )
        .route("/rules/{id}/toggle", post(admin_compatibility::toggle_rule))
        .route("/mappings", put(admin_compatibility::upsert_mapping))
        .route(
            "/mappings/{engine_id}/{part_id}",
            delete(admin_compatibility::delete_mapping),
        )
}
