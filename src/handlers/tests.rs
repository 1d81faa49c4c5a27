//! # Tests for Handlers
//!
//! Router-level tests driving the API through `tower::ServiceExt::oneshot`
//! against an in-memory SQLite database.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::issue_token;
use crate::config::AppConfig;
use crate::cursor::PageRequest;
use crate::models::profile::Role;
use crate::repositories::profile::NewProfile;
use crate::repositories::{AccessScope, ProfileRepository, RequestRepository, WorkspaceRepository};
use crate::server::{AppState, create_app};

struct TestApp {
    app: Router,
    state: AppState,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let state = AppState {
            config: Arc::new(AppConfig::default()),
            db,
        };
        Self {
            app: create_app(state.clone()),
            state,
        }
    }

    async fn profile(&self, role: Role, workspace_id: Option<Uuid>) -> String {
        let profile = ProfileRepository::new(&self.state.db)
            .create(NewProfile {
                id: None,
                email: format!("{}@sakina.test", Uuid::new_v4().simple()),
                full_name: None,
                role,
                workspace_id,
            })
            .await
            .unwrap();
        issue_token(
            &self.state.config.jwt_secret,
            profile.id,
            chrono::Duration::hours(1),
        )
        .unwrap()
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn test_root_handler_returns_service_info() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "sakina");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_healthz_reports_database() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/healthz", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/api/v1/me", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["trace_id"].is_string());
}

#[tokio::test]
async fn test_trace_id_is_echoed() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/")
        .header("x-trace-id", "trace-abc-123")
        .body(Body::empty())
        .unwrap();

    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("x-trace-id").unwrap(),
        "trace-abc-123"
    );
}

#[tokio::test]
async fn test_me_returns_caller_profile() {
    let app = TestApp::new().await;
    let token = app.profile(Role::HotelProvider, None).await;

    let (status, body) = app.send("GET", "/api/v1/me", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "hotel_provider");
    assert!(body["meta"]["timestamp"].is_string());
}

#[tokio::test]
async fn test_admin_only_routes_reject_other_roles() {
    let app = TestApp::new().await;
    let token = app.profile(Role::HotelProvider, None).await;

    let (status, _) = app.send("GET", "/api/v1/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/workspaces",
            Some(&token),
            Some(json!({"name": "Sneaky"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_limit_is_rejected() {
    let app = TestApp::new().await;
    let token = app.profile(Role::Admin, None).await;

    let (status, body) = app
        .send("GET", "/api/v1/requests?limit=0", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_malformed_body_returns_problem_json() {
    let app = TestApp::new().await;
    let token = app.profile(Role::Admin, None).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/workspaces")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert!(body["message"].as_str().unwrap().contains("JSON syntax error"));

    // Wrong field types are reported the same way.
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/workspaces",
            Some(&token),
            Some(json!({"name": 42})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_request_is_not_kept_when_notifying_admins_fails() {
    let app = TestApp::new().await;
    let workspace = WorkspaceRepository::new(&app.state.db)
        .create("Nile Travel".to_string())
        .await
        .unwrap();
    let agent = app.profile(Role::TravelAgent, Some(workspace.id)).await;
    app.profile(Role::Admin, None).await;

    app.state
        .db
        .execute_unprepared("DROP TABLE notifications")
        .await
        .unwrap();

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/requests",
            Some(&agent),
            Some(json!({
                "city": "Makkah",
                "check_in": "2025-11-01",
                "check_out": "2025-11-04",
                "rooms": {"single": 0, "double": 2, "triple": 0, "quad": 0},
                "package_type": "room_only"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let stored = RequestRepository::new(&app.state.db)
        .list(AccessScope::Admin, None, PageRequest::default())
        .await
        .unwrap();
    assert!(stored.items.is_empty());
}

#[tokio::test]
async fn test_bidding_flow_over_http() {
    let app = TestApp::new().await;
    let workspace = WorkspaceRepository::new(&app.state.db)
        .create("Nile Travel".to_string())
        .await
        .unwrap();
    let agent = app.profile(Role::TravelAgent, Some(workspace.id)).await;
    let provider_a = app.profile(Role::HotelProvider, None).await;
    let provider_b = app.profile(Role::HotelProvider, None).await;
    let admin = app.profile(Role::Admin, None).await;

    // Agent submits a two-night request for one double room.
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/requests",
            Some(&agent),
            Some(json!({
                "city": "Makkah",
                "check_in": "2025-06-01",
                "check_out": "2025-06-03",
                "rooms": {"double": 1},
                "package_type": "half_board"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let request_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "Submitted");
    assert_eq!(body["data"]["nights"], 2);

    // Two providers bid.
    let (status, body) = app
        .send(
            "POST",
            &format!("/api/v1/requests/{}/offerings", request_id),
            Some(&provider_a),
            Some(json!({"hotel_name": "Hilton Suites", "prices": {"double": 50_000}})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let winner_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["total_base_price"], 100_000);

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/v1/requests/{}/offerings", request_id),
            Some(&provider_b),
            Some(json!({"hotel_name": "Swissotel", "prices": {"double": 55_000}})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let loser_id = body["data"]["id"].as_str().unwrap().to_string();

    // A missing price for a requested category is rejected.
    let provider_c = app.profile(Role::HotelProvider, None).await;
    let (status, _) = app
        .send(
            "POST",
            &format!("/api/v1/requests/{}/offerings", request_id),
            Some(&provider_c),
            Some(json!({"hotel_name": "Nowhere", "prices": {"single": 10_000}})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Agent sees nothing until a margin is applied.
    let (status, body) = app
        .send(
            "GET",
            &format!("/api/v1/requests/{}/offerings", request_id),
            Some(&agent),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // Admin quotes with a 10% margin.
    let (status, body) = app
        .send(
            "POST",
            &format!("/api/v1/offerings/{}/margin", winner_id),
            Some(&admin),
            Some(json!({"margin_percent": 10.0})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["offering"]["total_final_price"], 110_000);
    assert_eq!(body["data"]["request"]["status"], "Quoted");

    // Agent now sees the quoted bid without base prices.
    let (_, body) = app
        .send(
            "GET",
            &format!("/api/v1/requests/{}/offerings", request_id),
            Some(&agent),
            None,
        )
        .await;
    let visible = body["data"].as_array().unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0]["total_final_price"], 110_000);
    assert!(visible[0]["base_prices"].is_null());
    assert!(visible[0]["margin_percent"].is_null());

    // Admin confirms; the other bid is canceled.
    let (status, body) = app
        .send(
            "POST",
            &format!("/api/v1/offerings/{}/confirm", winner_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["offering"]["status"], "CONFIRMED");
    assert_eq!(body["data"]["request"]["status"], "Confirmed");
    assert_eq!(body["data"]["canceled_offering_ids"], json!([loser_id]));

    // Confirming again conflicts.
    let (status, _) = app
        .send(
            "POST",
            &format!("/api/v1/offerings/{}/confirm", winner_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The losing provider was notified.
    let (_, body) = app
        .send(
            "GET",
            "/api/v1/notifications?unread_only=true",
            Some(&provider_b),
            None,
        )
        .await;
    let kinds: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["kind"].as_str())
        .collect();
    assert_eq!(kinds, vec!["offering_canceled"]);

    // Admin invoices the booking.
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/invoices",
            Some(&admin),
            Some(json!({"offering_id": winner_id})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["amount"], 110_000);
    assert_eq!(body["data"]["status"], "draft");

    // Stats reflect the outcome.
    let (_, body) = app.send("GET", "/api/v1/stats", Some(&admin), None).await;
    assert_eq!(body["data"]["requests"]["Confirmed"], 1);
    assert_eq!(body["data"]["offerings"]["CANCELED"], 1);
}
