//! Integration tests for HTTP handlers
//!
//! Each test runs the full router against a migrated in-memory database
//! seeded with tenants 1..=3, using tokens from `/api/token`.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use application::{ApplicationError, DatabaseHealth, DatabaseHealthPort};
use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use infrastructure::{AppConfig, AsyncDatabase};
use presentation_http::{create_router, state::AppState};
use serde_json::{Value, json};

/// Health port whose database never answers
struct UnreachableDatabase;

#[async_trait]
impl DatabaseHealthPort for UnreachableDatabase {
    async fn is_available(&self) -> bool {
        false
    }

    async fn check_health(&self) -> Result<DatabaseHealth, ApplicationError> {
        Err(ApplicationError::Persistence("connection refused".into()))
    }
}

async fn create_test_state() -> AppState {
    let db = AsyncDatabase::in_memory()
        .await
        .expect("Failed to create in-memory database");
    db.migrate().await.expect("Failed to run migrations");
    AppState::from_database(&db, AppConfig::default())
}

async fn create_test_server() -> TestServer {
    let state = create_test_state().await;
    TestServer::new(create_router(state)).expect("Failed to create test server")
}

async fn token(server: &TestServer, name: &str, tenant: i32) -> String {
    let response = server
        .get("/api/token")
        .add_query_param("name", name)
        .add_query_param("tenant", tenant)
        .await;
    response.assert_status_ok();
    response.json::<Value>()["token"]
        .as_str()
        .expect("token in response")
        .to_string()
}

async fn admin(server: &TestServer, tenant: i32) -> String {
    token(server, "admin", tenant).await
}

async fn contributor(server: &TestServer, tenant: i32) -> String {
    token(server, "bob", tenant).await
}

fn names(body: &Value) -> Vec<&str> {
    body.as_array()
        .expect("array body")
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect()
}

// ============ Health Endpoint Tests ============

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let server = create_test_server().await;

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn readiness_reports_sqlite_version() {
    let server = create_test_server().await;

    let response = server.get("/ready").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["ready"], true);
    assert!(body["database"]["version"].is_string());
}

#[tokio::test]
async fn readiness_unavailable_without_database() {
    let mut state = create_test_state().await;
    state.database_health = Arc::new(UnreachableDatabase);
    let server = TestServer::new(create_router(state)).expect("Failed to create test server");

    let response = server.get("/ready").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["ready"], false);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let server = create_test_server().await;
    let id = "0190b5a4-3c1e-7cc0-8000-0000000000aa";

    let response = server.get("/health").add_header("X-Request-Id", id).await;

    assert_eq!(response.header("X-Request-Id"), id);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let server = create_test_server().await;

    let response = server.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    assert!(response.json::<Value>()["paths"]["/sensitive-data"].is_object());
}

// ============ Token Tests ============

#[tokio::test]
async fn token_for_admin_name_carries_administrator_role() {
    let server = create_test_server().await;

    let response = server
        .get("/api/token")
        .add_query_param("name", "admin")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["login"], "Jean-Michel ADMIN");
    assert_eq!(body["roles"], json!(["Administrator"]));
    assert_eq!(body["tenant_id"], 1);
}

#[tokio::test]
async fn token_for_other_names_is_contributor() {
    let server = create_test_server().await;

    let response = server
        .get("/api/token")
        .add_query_param("name", "bob")
        .add_query_param("tenant", 3)
        .await;

    let body: Value = response.json();
    assert_eq!(body["roles"], json!(["Contributor"]));
    assert_eq!(body["tenant_id"], 3);
}

#[tokio::test]
async fn token_for_unknown_tenant_is_rejected() {
    let server = create_test_server().await;

    let response = server
        .get("/api/token")
        .add_query_param("name", "admin")
        .add_query_param("tenant", 42)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn token_requires_a_name() {
    let server = create_test_server().await;

    server.get("/api/token").await.assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/api/token")
        .add_query_param("name", "   ")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ============ Authentication Tests ============

#[tokio::test]
async fn data_requires_a_token() {
    let server = create_test_server().await;

    server
        .get("/sensitive-data")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/sensitive-data")
        .authorization_bearer("garbage")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tenants_are_listed() {
    let server = create_test_server().await;
    let token = contributor(&server, 2).await;

    let response = server.get("/tenants").authorization_bearer(&token).await;

    response.assert_status_ok();
    let ids: Vec<i64> = response
        .json::<Value>()
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, [1, 2, 3]);
}

// ============ Read Tests ============

#[tokio::test]
async fn list_returns_only_callers_tenant_sorted_by_name() {
    let server = create_test_server().await;
    let token = contributor(&server, 1).await;

    let response = server.get("/sensitive-data").authorization_bearer(&token).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        names(&body),
        [
            "Compte bancaire du locataire 1",
            "Email du locataire 1",
            "Nom du locataire 1",
            "Numéro de sécu du locataire 1"
        ]
    );
    assert!(body.as_array().unwrap().iter().all(|d| d["tenant_name"] == "Locataire 1"));
}

#[tokio::test]
async fn foreign_row_is_not_found() {
    let server = create_test_server().await;
    let tenant_one = contributor(&server, 1).await;
    let tenant_two = contributor(&server, 2).await;

    server
        .get("/sensitive-data/5")
        .authorization_bearer(&tenant_one)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = server
        .get("/sensitive-data/5")
        .authorization_bearer(&tenant_two)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["name"], "Nom du locataire 2");
}

#[tokio::test]
async fn list_by_type_filters_category() {
    let server = create_test_server().await;
    let token = contributor(&server, 3).await;

    let response = server
        .get("/sensitive-data/type/email")
        .authorization_bearer(&token)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(names(&body), ["Email du locataire 3"]);
    assert_eq!(body[0]["type"], "Email");

    server
        .get("/sensitive-data/type/Salary")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn grid_returns_second_page_and_total() {
    let server = create_test_server().await;
    let token = contributor(&server, 1).await;

    let response = server
        .post("/sensitive-data/grid")
        .authorization_bearer(&token)
        .json(&json!({
            "page": 1,
            "page_size": 2,
            "sorts": [{ "field_name": "Name" }]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        names(&body["items"]),
        ["Nom du locataire 1", "Numéro de sécu du locataire 1"]
    );
    assert_eq!(body["total_count"], 4);
    assert_eq!(body["page_count"], 2);
}

#[tokio::test]
async fn grid_rejects_unknown_field_and_negative_paging() {
    let server = create_test_server().await;
    let token = contributor(&server, 1).await;

    server
        .post("/sensitive-data/grid")
        .authorization_bearer(&token)
        .json(&json!({ "filters": [{ "field_name": "Salary", "value": "1" }] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .post("/sensitive-data/grid")
        .authorization_bearer(&token)
        .json(&json!({ "page": -1, "page_size": 2 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn grid_filter_by_type_name() {
    let server = create_test_server().await;
    let token = contributor(&server, 2).await;

    let response = server
        .post("/sensitive-data/grid")
        .authorization_bearer(&token)
        .json(&json!({
            "filters": [{ "field_name": "Type", "predicate": "Equal", "value": "Email" }],
            "sorts": [{ "field_name": "Name", "direction": "Ascending" }]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(names(&body["items"]), ["Email du locataire 2"]);
    assert_eq!(body["total_count"], 1);
}

#[tokio::test]
async fn search_uses_aliases_and_global_term() {
    let server = create_test_server().await;
    let token = contributor(&server, 1).await;

    let response = server
        .get("/sensitive-data/search")
        .authorization_bearer(&token)
        .add_query_param("type", "BankAccount")
        .await;
    response.assert_status_ok();
    assert_eq!(
        names(&response.json::<Value>()["items"]),
        ["Compte bancaire du locataire 1"]
    );

    let response = server
        .get("/sensitive-data/search")
        .authorization_bearer(&token)
        .add_query_param("search", "locataire")
        .add_query_param("sort", "name")
        .add_query_param("desc", true)
        .add_query_param("page", 0)
        .add_query_param("page_size", 3)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total_count"], 4);
    assert_eq!(
        names(&body["items"]),
        [
            "Numéro de sécu du locataire 1",
            "Nom du locataire 1",
            "Email du locataire 1"
        ]
    );
}

// ============ Write Tests ============

#[tokio::test]
async fn contributor_cannot_write() {
    let server = create_test_server().await;
    let token = contributor(&server, 1).await;

    server
        .post("/sensitive-data")
        .authorization_bearer(&token)
        .json(&json!({ "type": "Email", "name": "Pro" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .delete("/sensitive-data/1")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn created_row_is_stamped_and_isolated() {
    let server = create_test_server().await;
    let tenant_one = admin(&server, 1).await;
    let tenant_two = admin(&server, 2).await;

    let response = server
        .post("/sensitive-data")
        .authorization_bearer(&tenant_one)
        .json(&json!({
            "type": "Email",
            "name": "Email professionnel",
            "content": "pro@example.org",
            "track_creation_user": "Mallory"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["tenant_id"], 1);
    assert_eq!(created["track_creation_user"], "Jean-Michel ADMIN");
    let id = created["id"].as_i64().unwrap();

    server
        .get(&format!("/sensitive-data/{id}"))
        .authorization_bearer(&tenant_one)
        .await
        .assert_status_ok();
    server
        .get(&format!("/sensitive-data/{id}"))
        .authorization_bearer(&tenant_two)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_for_another_tenant_is_unauthorized() {
    let server = create_test_server().await;
    let token = admin(&server, 1).await;

    server
        .post("/sensitive-data")
        .authorization_bearer(&token)
        .json(&json!({ "type": "Email", "name": "Intrus", "tenant_id": 2 }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_validates_name() {
    let server = create_test_server().await;
    let token = admin(&server, 1).await;

    server
        .post("/sensitive-data")
        .authorization_bearer(&token)
        .json(&json!({ "type": "Email", "name": "" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .post("/sensitive-data")
        .authorization_bearer(&token)
        .json(&json!({ "type": "Salary", "name": "x" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_name_is_a_server_error() {
    let server = create_test_server().await;
    let token = admin(&server, 1).await;

    server
        .post("/sensitive-data")
        .authorization_bearer(&token)
        .json(&json!({ "type": "Name", "name": "Nom du locataire 1" }))
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn update_keeps_creation_provenance() {
    let server = create_test_server().await;
    let token = admin(&server, 1).await;

    let response = server
        .put("/sensitive-data/2")
        .authorization_bearer(&token)
        .json(&json!({
            "id": 2,
            "type": "Email",
            "name": "Email du locataire 1",
            "content": "nouveau@example.org",
            "track_creation_user": "Mallory"
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["content"], "nouveau@example.org");
    assert_eq!(body["track_creation_user"], "System");
    assert_eq!(body["track_creation_time"], "2024-01-01T00:00:00Z");
    assert_eq!(body["track_last_write_user"], "Jean-Michel ADMIN");
}

#[tokio::test]
async fn update_with_mismatched_ids_is_bad_request() {
    let server = create_test_server().await;
    let token = admin(&server, 1).await;

    server
        .put("/sensitive-data/2")
        .authorization_bearer(&token)
        .json(&json!({ "id": 3, "type": "Email", "name": "x" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_of_foreign_row_is_not_found() {
    let server = create_test_server().await;
    let token = admin(&server, 1).await;

    server
        .put("/sensitive-data/5")
        .authorization_bearer(&token)
        .json(&json!({ "type": "Name", "name": "Détourné" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let owner = contributor(&server, 2).await;
    let response = server
        .get("/sensitive-data/5")
        .authorization_bearer(&owner)
        .await;
    assert_eq!(response.json::<Value>()["name"], "Nom du locataire 2");
}

#[tokio::test]
async fn update_moving_row_to_another_tenant_is_unauthorized() {
    let server = create_test_server().await;
    let token = admin(&server, 1).await;

    server
        .put("/sensitive-data/1")
        .authorization_bearer(&token)
        .json(&json!({ "type": "Name", "name": "Nom", "tenant_id": 3 }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn delete_removes_once() {
    let server = create_test_server().await;
    let token = admin(&server, 1).await;

    server
        .delete("/sensitive-data/4")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete("/sensitive-data/4")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_of_foreign_row_is_not_found() {
    let server = create_test_server().await;
    let token = admin(&server, 1).await;

    server
        .delete("/sensitive-data/9")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let owner = contributor(&server, 3).await;
    server
        .get("/sensitive-data/9")
        .authorization_bearer(&owner)
        .await
        .assert_status_ok();
}
