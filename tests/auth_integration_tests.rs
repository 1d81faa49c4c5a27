//! Integration tests for bearer authentication and workspace validation

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use sakina::auth::issue_token;
use sakina::config::AppConfig;
use sakina::models::profile::Role;
use sakina::repositories::WorkspaceRepository;
use sakina::repositories::workspace::UpdateWorkspace;
use sakina::server::{AppState, create_app};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{create_user, create_workspace, setup_test_db};

async fn spawn_test_app() -> Result<(Router, Arc<AppConfig>, DatabaseConnection)> {
    let db = setup_test_db().await?;
    let config = Arc::new(AppConfig::default());
    let app = create_app(AppState {
        config: Arc::clone(&config),
        db: db.clone(),
    });
    Ok((app, config, db))
}

async fn get_me(app: &Router, token: &str) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .uri("/api/v1/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn valid_token_resolves_profile() -> Result<()> {
    let (app, config, db) = spawn_test_app().await?;
    let workspace = create_workspace(&db, "Agency A").await?;
    let agent = create_user(&db, Role::TravelAgent, Some(workspace)).await?;
    let token = issue_token(&config.jwt_secret, agent.id, chrono::Duration::hours(1))?;

    let (status, body) = get_me(&app, &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], agent.id.to_string());
    assert_eq!(body["data"]["workspace_id"], workspace.to_string());
    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected() -> Result<()> {
    let (app, config, db) = spawn_test_app().await?;
    let admin = create_user(&db, Role::Admin, None).await?;
    let token = issue_token(&config.jwt_secret, admin.id, chrono::Duration::hours(-2))?;

    let (status, body) = get_me(&app, &token).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn token_signed_with_other_secret_is_rejected() -> Result<()> {
    let (app, _config, db) = spawn_test_app().await?;
    let admin = create_user(&db, Role::Admin, None).await?;
    let token = issue_token(
        "some-other-secret-that-is-long-enough",
        admin.id,
        chrono::Duration::hours(1),
    )?;

    let (status, _) = get_me(&app, &token).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn unknown_profile_is_rejected() -> Result<()> {
    let (app, config, _db) = spawn_test_app().await?;
    let token = issue_token(&config.jwt_secret, Uuid::new_v4(), chrono::Duration::hours(1))?;

    let (status, _) = get_me(&app, &token).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn inactive_workspace_blocks_its_agents() -> Result<()> {
    let (app, config, db) = spawn_test_app().await?;
    let workspace = create_workspace(&db, "Agency A").await?;
    let agent = create_user(&db, Role::TravelAgent, Some(workspace)).await?;
    let token = issue_token(&config.jwt_secret, agent.id, chrono::Duration::hours(1))?;

    WorkspaceRepository::new(&db)
        .update(
            workspace,
            UpdateWorkspace {
                name: None,
                is_active: Some(false),
            },
        )
        .await?;

    let (status, body) = get_me(&app, &token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn malformed_authorization_header_is_rejected() -> Result<()> {
    let (app, _config, _db) = spawn_test_app().await?;
    let request = Request::builder()
        .uri("/api/v1/me")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())?;

    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
