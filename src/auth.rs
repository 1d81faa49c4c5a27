//! # Authentication and Authorization
//!
//! Bearer JWT authentication for protected API endpoints. Tokens carry the
//! profile id as `sub`; the role and workspace are always read from the
//! database so a revoked or re-scoped user takes effect immediately.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, unauthorized};
use crate::models::profile::Role;
use crate::repositories::{AccessScope, ProfileRepository, WorkspaceRepository};
use crate::server::AppState;

/// JWT claims accepted by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Profile id
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
}

/// The authenticated caller, resolved from the bearer token and their profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: Role,
    pub workspace_id: Option<Uuid>,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Data visibility for this caller.
    pub fn scope(&self) -> AccessScope {
        match self.role {
            Role::Admin | Role::SuperAdmin => AccessScope::Admin,
            Role::HotelProvider => AccessScope::Provider {
                provider_id: self.id,
            },
            // The middleware rejects agents without a workspace; nil matches nothing.
            Role::TravelAgent => AccessScope::Agent {
                workspace_id: self.workspace_id.unwrap_or_else(Uuid::nil),
            },
        }
    }

    /// Rejects callers whose role is not in `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            return Ok(());
        }
        let names: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
        Err(forbidden(Some(&format!(
            "This action requires one of the roles: {}",
            names.join(", ")
        ))))
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_role(&[Role::Admin, Role::SuperAdmin])
    }

    /// The caller's workspace; only travel agents have one.
    pub fn require_workspace(&self) -> Result<Uuid, ApiError> {
        self.require_role(&[Role::TravelAgent])?;
        self.workspace_id
            .ok_or_else(|| forbidden(Some("Travel agent is not attached to a workspace")))
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Issues an HS256 token for `profile_id` valid for `ttl`.
pub fn issue_token(
    secret: &str,
    profile_id: Uuid,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: profile_id.to_string(),
        exp: (now + ttl).timestamp().max(0) as usize,
        iat: Some(now.timestamp().max(0) as usize),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validates signature and expiry, returning the profile id.
pub fn verify_token(secret: &str, token: &str) -> Result<Uuid, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| {
        tracing::debug!(error = %err, "Rejected bearer token");
        unauthorized(Some("Invalid or expired token"))
    })?;

    token_data
        .claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| unauthorized(Some("Invalid token subject")))
}

/// Authentication middleware that validates bearer tokens and resolves the caller
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    let profile_id = verify_token(&state.config.jwt_secret, token)?;

    let profile = ProfileRepository::new(&state.db)
        .get(profile_id)
        .await?
        .ok_or_else(|| unauthorized(Some("Unknown user")))?;

    if profile.role.requires_workspace() {
        let workspace_id = profile
            .workspace_id
            .ok_or_else(|| forbidden(Some("Travel agent is not attached to a workspace")))?;
        let workspace = WorkspaceRepository::new(&state.db)
            .get(workspace_id)
            .await?
            .ok_or_else(|| forbidden(Some("Workspace not found")))?;
        if !workspace.is_active {
            return Err(forbidden(Some("Workspace is inactive")));
        }
    }

    let user = CurrentUser {
        id: profile.id,
        role: profile.role,
        workspace_id: profile.workspace_id,
    };
    tracing::debug!(user_id = %user.id, role = %user.role, "Authenticated request");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or_else(|| unauthorized(Some("Authentication required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{
        WorkspaceRepository,
        profile::NewProfile,
        workspace::UpdateWorkspace,
    };
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        AppState {
            config: Arc::new(AppConfig {
                profile: "test".to_string(),
                ..Default::default()
            }),
            db,
        }
    }

    async fn run_middleware(state: AppState, request: Request<Body>) -> Response {
        async fn handler(user: CurrentUser) -> String {
            user.role.to_string()
        }

        Router::new()
            .route("/test", get(handler))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            ))
            .with_state(state)
            .oneshot(request)
            .await
            .unwrap()
    }

    fn bearer(state: &AppState, profile_id: Uuid) -> String {
        let token = issue_token(&state.config.jwt_secret, profile_id, Duration::hours(1)).unwrap();
        format!("Bearer {}", token)
    }

    async fn create_profile(state: &AppState, role: Role, workspace_id: Option<Uuid>) -> Uuid {
        ProfileRepository::new(&state.db)
            .create(NewProfile {
                id: None,
                email: format!("{}@sakina.test", Uuid::new_v4().simple()),
                full_name: None,
                role,
                workspace_id,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn missing_auth_header_returns_401() {
        let state = test_state().await;
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = run_middleware(state, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_auth_scheme_returns_401() {
        let state = test_state().await;
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Basic dGVzdDoxMjM=")
            .body(Body::empty())
            .unwrap();

        let response = run_middleware(state, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_returns_401() {
        let state = test_state().await;
        let profile_id = create_profile(&state, Role::Admin, None).await;
        let token = issue_token(
            "a-completely-different-secret-value",
            profile_id,
            Duration::hours(1),
        )
        .unwrap();

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = run_middleware(state, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_token_returns_401() {
        let state = test_state().await;
        let profile_id = create_profile(&state, Role::Admin, None).await;
        let token =
            issue_token(&state.config.jwt_secret, profile_id, Duration::hours(-2)).unwrap();

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = run_middleware(state, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_profile_returns_401() {
        let state = test_state().await;
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", bearer(&state, Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();

        let response = run_middleware(state, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_resolves_role_from_profile() {
        let state = test_state().await;
        let profile_id = create_profile(&state, Role::HotelProvider, None).await;
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", bearer(&state, profile_id))
            .body(Body::empty())
            .unwrap();

        let response = run_middleware(state, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"hotel_provider");
    }

    #[tokio::test]
    async fn agent_of_inactive_workspace_returns_403() {
        let state = test_state().await;
        let workspaces = WorkspaceRepository::new(&state.db);
        let workspace = workspaces.create("Dormant Travel".to_string()).await.unwrap();
        let agent_id = create_profile(&state, Role::TravelAgent, Some(workspace.id)).await;
        workspaces
            .update(
                workspace.id,
                UpdateWorkspace {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", bearer(&state, agent_id))
            .body(Body::empty())
            .unwrap();

        let response = run_middleware(state, request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn scope_follows_role() {
        let id = Uuid::new_v4();
        let workspace_id = Uuid::new_v4();

        let admin = CurrentUser {
            id,
            role: Role::SuperAdmin,
            workspace_id: None,
        };
        assert_eq!(admin.scope(), AccessScope::Admin);
        assert!(admin.require_admin().is_ok());

        let provider = CurrentUser {
            id,
            role: Role::HotelProvider,
            workspace_id: None,
        };
        assert_eq!(provider.scope(), AccessScope::Provider { provider_id: id });
        assert!(provider.require_admin().is_err());
        assert!(provider.require_workspace().is_err());

        let agent = CurrentUser {
            id,
            role: Role::TravelAgent,
            workspace_id: Some(workspace_id),
        };
        assert_eq!(agent.scope(), AccessScope::Agent { workspace_id });
        assert_eq!(agent.require_workspace().unwrap(), workspace_id);
    }
}
