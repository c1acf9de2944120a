//! HTTP-level integration tests for the compatibility endpoints.
//!
//! Catalog rows are created through the repository layer; the six seeded
//! rules from the migrations are active in every test database.

mod common;

use axum::http::StatusCode;
use common::{
    admin_token, body_json, build_test_app, delete_auth, get, get_auth, post_json,
    post_json_auth, put_json_auth, seed_engine, seed_part,
};
use kartparts_db::models::build::CreateBuild;
use kartparts_db::repositories::{BuildRepo, PartRepo};
use serde_json::{json, Value};
use sqlx::PgPool;

fn ids(json: &Value) -> Vec<i64> {
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Public: rules
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_public_rule_list_shows_active_rules(pool: PgPool) {
    let response = get(build_test_app(pool.clone()), "/api/v1/compatibility/rules").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let rules = json["data"].as_array().unwrap();
    assert_eq!(rules.len(), 6);
    assert!(rules.iter().all(|r| r["is_active"] == true));

    let response = get(
        build_test_app(pool),
        "/api/v1/compatibility/rules?source_category=engine",
    )
    .await;
    let json = body_json(response).await;
    let rules = json["data"].as_array().unwrap();
    assert_eq!(rules.len(), 2);
    assert!(rules.iter().all(|r| r["source_category"] == "engine"));
}

// ---------------------------------------------------------------------------
// Public: checks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_flags_shaft_mismatch(pool: PgPool) {
    let engine = seed_engine(&pool, "predator-212", 0.75).await;
    let clutch = seed_part(&pool, "clutch-1in", "clutch", "Hilliard", json!({"bore_diameter": 1.0}), 59.0).await;

    let response = post_json(
        build_test_app(pool),
        "/api/v1/compatibility/check",
        json!({"engine_id": engine.id, "part_ids": [clutch.id]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["compatible"], false);
    let warnings = json["data"]["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["type"], "error");
    assert_eq!(warnings[0]["source"], engine.name);
    assert_eq!(warnings[0]["target"], clutch.name);
    assert!(warnings[0]["rule_id"].is_i64());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_matching_selection_is_compatible(pool: PgPool) {
    let engine = seed_engine(&pool, "predator-212", 0.75).await;
    // Ingested parts use `bore_in`; the rule asks for `bore_diameter`.
    let clutch = seed_part(&pool, "clutch-34", "clutch", "Max-Torque", json!({"bore_in": "0.75"}), 45.0).await;

    let response = post_json(
        build_test_app(pool),
        "/api/v1/compatibility/check",
        json!({"engine_id": engine.id, "part_ids": [clutch.id]}),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["compatible"], true);
    assert!(json["data"]["warnings"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_engine_without_drive_gets_hint(pool: PgPool) {
    let engine = seed_engine(&pool, "predator-212", 0.75).await;

    let response = post_json(
        build_test_app(pool),
        "/api/v1/compatibility/check",
        json!({"engine_id": engine.id}),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["compatible"], true);
    let warnings = json["data"]["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["type"], "info");
    assert_eq!(warnings[0]["target"], "Drive System");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_unknown_part_returns_404(pool: PgPool) {
    let response = post_json(
        build_test_app(pool),
        "/api/v1/compatibility/check",
        json!({"part_ids": [999_999]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_saved_build(pool: PgPool) {
    let engine = seed_engine(&pool, "predator-212", 0.75).await;
    let clutch = seed_part(&pool, "clutch-1in", "clutch", "Hilliard", json!({"bore_diameter": 1.0}), 59.0).await;
    let chain = seed_part(&pool, "chain-35", "chain", "Hilliard", json!({"pitch": "#35"}), 20.0).await;
    let sprocket = seed_part(&pool, "sprocket-40", "sprocket", "Hilliard", json!({"pitch": "#40"}), 15.0).await;

    let build = BuildRepo::create(
        &pool,
        &CreateBuild {
            name: "Mismatched".to_string(),
            description: None,
            engine_id: Some(engine.id),
            parts: json!({
                "clutch": clutch.id,
                "chain": chain.id.to_string(),
                "sprocket": [sprocket.id],
            }),
            total_price: None,
            is_public: Some(true),
            created_by: None,
        },
    )
    .await
    .unwrap();

    let response = get(
        build_test_app(pool),
        &format!("/api/v1/compatibility/builds/{}", build.id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["compatible"], false);
    let messages: Vec<&str> = json["data"]["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages.len(), 2);
    assert!(messages.contains(&"Chain pitch does not match the sprocket"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_missing_build_returns_404(pool: PgPool) {
    let response = get(build_test_app(pool), "/api/v1/compatibility/builds/424242").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Public: compatible parts and mappings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_compatible_parts_respects_rules_and_direct_fit(pool: PgPool) {
    let engine = seed_engine(&pool, "predator-212", 0.75).await;
    let bad = seed_part(&pool, "clutch-1in", "clutch", "Hilliard", json!({"bore_diameter": 1.0}), 59.0).await;
    let good = seed_part(&pool, "clutch-34", "clutch", "Hilliard", json!({"bore_diameter": 0.75}), 49.0).await;
    let chain = seed_part(&pool, "chain-35", "chain", "Hilliard", json!({}), 20.0).await;

    let uri = format!("/api/v1/compatibility/engines/{}/parts?category=clutch", engine.id);
    let json = body_json(get(build_test_app(pool.clone()), &uri).await).await;
    assert_eq!(ids(&json), vec![good.id]);

    // Without a category filter, unrelated parts are always offered.
    let all_uri = format!("/api/v1/compatibility/engines/{}/parts", engine.id);
    let json = body_json(get(build_test_app(pool.clone()), &all_uri).await).await;
    let all = ids(&json);
    assert!(all.contains(&chain.id));
    assert!(!all.contains(&bad.id));

    // A direct-fit mapping overrides the failing rule.
    let response = put_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/admin/compatibility/mappings",
        json!({
            "engine_id": engine.id,
            "part_id": bad.id,
            "compatibility_level": "direct_fit",
            "notes": "Ships with a 3/4 bushing"
        }),
        &admin_token(1),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get(build_test_app(pool), &uri).await).await;
    let mut listed = ids(&json);
    listed.sort_unstable();
    let mut expected = vec![bad.id, good.id];
    expected.sort_unstable();
    assert_eq!(listed, expected);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_compatible_parts_rejects_unknown_category(pool: PgPool) {
    let engine = seed_engine(&pool, "predator-212", 0.75).await;
    let uri = format!("/api/v1/compatibility/engines/{}/parts?category=spaceship", engine.id);
    let response = get(build_test_app(pool), &uri).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mapping_adds_warning_and_lists(pool: PgPool) {
    let engine = seed_engine(&pool, "predator-212", 0.75).await;
    let clutch = seed_part(&pool, "clutch-34", "clutch", "Hilliard", json!({"bore_diameter": 0.75}), 49.0).await;
    let token = admin_token(1);

    let response = put_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/admin/compatibility/mappings",
        json!({
            "engine_id": engine.id,
            "part_id": clutch.id,
            "compatibility_level": "requires_modification"
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(
        post_json(
            build_test_app(pool.clone()),
            "/api/v1/compatibility/check",
            json!({"engine_id": engine.id, "part_ids": [clutch.id]}),
        )
        .await,
    )
    .await;
    let warnings = json["data"]["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["type"], "warning");
    assert!(warnings[0]["rule_id"].is_null());

    let uri = format!("/api/v1/compatibility/engines/{}/mappings", engine.id);
    let json = body_json(get(build_test_app(pool.clone()), &uri).await).await;
    let mappings = json["data"].as_array().unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0]["part_category"], "clutch");
    assert_eq!(mappings[0]["compatibility_level"], "requires_modification");

    // Removing it twice: the second attempt finds nothing.
    let delete_uri = format!(
        "/api/v1/admin/compatibility/mappings/{}/{}",
        engine.id, clutch.id
    );
    let response = delete_auth(build_test_app(pool.clone()), &delete_uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = delete_auth(build_test_app(pool), &delete_uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mapping_rejects_bad_level_and_missing_part(pool: PgPool) {
    let engine = seed_engine(&pool, "predator-212", 0.75).await;
    let token = admin_token(1);

    let response = put_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/admin/compatibility/mappings",
        json!({"engine_id": engine.id, "part_id": 1, "compatibility_level": "maybe"}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(
        build_test_app(pool),
        "/api/v1/admin/compatibility/mappings",
        json!({"engine_id": engine.id, "part_id": 999_999, "compatibility_level": "direct_fit"}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Admin: rules
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_create_rule_normalises_legacy_condition(pool: PgPool) {
    let response = post_json_auth(
        build_test_app(pool),
        "/api/v1/admin/compatibility/rules",
        json!({
            "rule_type": "chain_size",
            "source_category": "chain",
            "target_category": "sprocket",
            "condition": {"source_key": "chain_size", "target_key": "chain_size", "comparison": "equals"},
            "warning_message": "Chain size mismatch"
        }),
        &admin_token(3),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let rule = &json["data"];
    assert_eq!(rule["severity"], "warning");
    assert_eq!(rule["created_by"], 3);
    assert_eq!(rule["condition"]["compare"], "equal");
    assert_eq!(rule["condition"]["source_field"], "specifications.chain_size");
    assert_eq!(rule["condition"]["target_field"], "specifications.chain_size");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_create_rule_rejects_invalid_condition(pool: PgPool) {
    let token = admin_token(1);

    // Engines have no `bore_diameter` column.
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/admin/compatibility/rules",
        json!({
            "rule_type": "shaft_fit",
            "source_category": "engine",
            "target_category": "clutch",
            "condition": {"compare": "equal", "source_field": "bore_diameter", "target_field": "specifications.bore_diameter"},
            "warning_message": "Mismatch",
            "severity": "error"
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/admin/compatibility/rules",
        json!({
            "rule_type": "shaft_fit",
            "source_category": "engine",
            "target_category": "clutch",
            "condition": {"compare": "roughly", "source_field": "shaft_diameter", "target_field": "specifications.bore_diameter"},
            "warning_message": "Mismatch"
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/admin/compatibility/rules",
        json!({
            "rule_type": "shaft_fit",
            "source_category": "engine",
            "target_category": "clutch",
            "condition": {"compare": "equal", "source_field": "shaft_diameter", "target_field": "specifications.bore_diameter"},
            "warning_message": "   "
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "warning_message must not be empty");

    let response = post_json_auth(
        build_test_app(pool),
        "/api/v1/admin/compatibility/rules",
        json!({
            "rule_type": "",
            "source_category": "engine",
            "target_category": "clutch",
            "condition": {"compare": "equal", "source_field": "shaft_diameter", "target_field": "specifications.bore_diameter"},
            "warning_message": "Mismatch"
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_update_rule_revalidates_merged_fields(pool: PgPool) {
    let token = admin_token(1);
    let json = body_json(
        get_auth(
            build_test_app(pool.clone()),
            "/api/v1/admin/compatibility/rules?rule_type=chain_pitch",
            &token,
        )
        .await,
    )
    .await;
    let id = json["data"][0]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/admin/compatibility/rules/{id}");

    let response = put_json_auth(
        build_test_app(pool.clone()),
        &uri,
        json!({"severity": "info", "warning_message": "Check chain pitch"}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["severity"], "info");
    assert_eq!(json["data"]["warning_message"], "Check chain pitch");
    assert_eq!(json["data"]["target_category"], "sprocket");

    let response = put_json_auth(
        build_test_app(pool.clone()),
        &uri,
        json!({"rule_type": "  "}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // `engine` is never a valid target.
    let response = put_json_auth(
        build_test_app(pool.clone()),
        &uri,
        json!({"target_category": "engine"}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(
        build_test_app(pool),
        "/api/v1/admin/compatibility/rules/999999",
        json!({"severity": "info"}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_delete_and_toggle_rule(pool: PgPool) {
    let token = admin_token(1);
    let json = body_json(
        get_auth(
            build_test_app(pool.clone()),
            "/api/v1/admin/compatibility/rules?rule_type=hub_fit",
            &token,
        )
        .await,
    )
    .await;
    let id = json["data"][0]["id"].as_i64().unwrap();

    let response = delete_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/admin/compatibility/rules/{id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Gone from the public list, still visible to admins.
    let json = body_json(get(build_test_app(pool.clone()), "/api/v1/compatibility/rules").await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 5);
    let json = body_json(
        get_auth(
            build_test_app(pool.clone()),
            "/api/v1/admin/compatibility/rules?is_active=false",
            &token,
        )
        .await,
    )
    .await;
    assert_eq!(json["data"][0]["id"], id);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/admin/compatibility/rules/{id}/toggle"),
        json!({"is_active": true}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["is_active"], true);

    let json = body_json(get(build_test_app(pool), "/api/v1/compatibility/rules").await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 6);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deleted_parts_are_invisible_to_checks(pool: PgPool) {
    let clutch = seed_part(&pool, "clutch-34", "clutch", "Hilliard", json!({}), 49.0).await;
    sqlx::query("UPDATE parts SET deleted_at = NOW() WHERE id = $1")
        .bind(clutch.id)
        .execute(&pool)
        .await
        .unwrap();
    assert!(PartRepo::find_by_id(&pool, clutch.id).await.unwrap().is_none());

    let response = post_json(
        build_test_app(pool),
        "/api/v1/compatibility/check",
        json!({"part_ids": [clutch.id]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
