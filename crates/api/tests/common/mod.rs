#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use kartparts_api::auth::jwt::{generate_access_token, JwtConfig};
use kartparts_api::config::ServerConfig;
use kartparts_api::router::build_app_router;
use kartparts_api::state::AppState;
use kartparts_core::roles::{ROLE_ADMIN, ROLE_USER};
use kartparts_db::models::engine::{CreateEngine, Engine};
use kartparts_db::models::part::{CreatePart, Part};
use kartparts_db::repositories::{EngineRepo, PartRepo};

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout, and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        bulk_undo_retention_days: 30,
        bulk_sweep_interval_secs: 60,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Bearer token for an admin user with the given ID.
pub fn admin_token(user_id: i64) -> String {
    generate_access_token(user_id, ROLE_ADMIN, &test_config().jwt).unwrap()
}

/// Bearer token for a regular (non-admin) user.
pub fn user_token(user_id: i64) -> String {
    generate_access_token(user_id, ROLE_USER, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, json: Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(json)).await
}

pub async fn post_json_auth(app: Router, uri: &str, json: Value, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(json)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json_auth(app: Router, uri: &str, json: Value, token: &str) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(json)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Catalog fixtures
// ---------------------------------------------------------------------------

/// Insert an engine with the given crankshaft diameter.
pub async fn seed_engine(pool: &PgPool, slug: &str, shaft_diameter: f64) -> Engine {
    EngineRepo::create(
        pool,
        &CreateEngine {
            slug: slug.to_string(),
            name: format!("Engine {slug}"),
            brand: "Predator".to_string(),
            displacement_cc: 212,
            horsepower: 6.5,
            torque: 8.1,
            shaft_diameter,
            shaft_length: 2.43,
            shaft_type: Some("straight".to_string()),
            mount_type: "standard".to_string(),
            weight_lbs: Some(37.0),
            price: Some(149.99),
        },
    )
    .await
    .unwrap()
}

/// Insert a part with the given category, brand, specifications, and price.
pub async fn seed_part(
    pool: &PgPool,
    slug: &str,
    category: &str,
    brand: &str,
    specifications: Value,
    price: f64,
) -> Part {
    PartRepo::create(
        pool,
        &CreatePart {
            slug: slug.to_string(),
            name: format!("{brand} {slug}"),
            category: category.to_string(),
            brand: Some(brand.to_string()),
            specifications: Some(specifications),
            price: Some(price),
        },
    )
    .await
    .unwrap()
}
