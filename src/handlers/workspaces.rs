//! # Workspaces API Handlers
//!
//! Travel agency tenants. Admins manage every workspace; a travel agent can
//! read their own.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::extract::JsonBody;
use super::types::{ApiResponse, DeletedResponse, PageQuery, PaginatedResponse, rfc3339};
use crate::auth::CurrentUser;
use crate::error::{ApiError, forbidden, not_found};
use crate::models::workspace;
use crate::repositories::WorkspaceRepository;
use crate::repositories::workspace::UpdateWorkspace;
use crate::server::AppState;

/// Workspace as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceDto {
    #[schema(value_type = String, example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "Nile Travel")]
    pub name: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<workspace::Model> for WorkspaceDto {
    fn from(model: workspace::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            is_active: model.is_active,
            created_at: rfc3339(model.created_at),
            updated_at: rfc3339(model.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateWorkspaceRequest {
    /// Display name (required, max 255 characters)
    #[schema(example = "Nile Travel")]
    pub name: String,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateWorkspaceRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

/// Create a workspace
#[utoipa::path(
    post,
    path = "/api/v1/workspaces",
    security(("bearer_auth" = [])),
    request_body = CreateWorkspaceRequest,
    responses(
        (status = 201, description = "Workspace created", body = ApiResponse<WorkspaceDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 409, description = "Workspace name already taken", body = ApiError)
    ),
    tag = "workspaces"
)]
pub async fn create_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WorkspaceDto>>), ApiError> {
    user.require_admin()?;

    let workspace = WorkspaceRepository::new(&state.db).create(body.name).await?;
    tracing::info!(workspace_id = %workspace.id, "Workspace created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(WorkspaceDto::from(workspace))),
    ))
}

/// List workspaces
#[utoipa::path(
    get,
    path = "/api/v1/workspaces",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Workspaces", body = PaginatedResponse<WorkspaceDto>),
        (status = 403, description = "Admin role required", body = ApiError)
    ),
    tag = "workspaces"
)]
pub async fn list_workspaces(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<WorkspaceDto>>, ApiError> {
    user.require_admin()?;
    let page = WorkspaceRepository::new(&state.db)
        .list(query.page_request()?)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, WorkspaceDto::from)))
}

/// Get a workspace
#[utoipa::path(
    get,
    path = "/api/v1/workspaces/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Workspace id")),
    responses(
        (status = 200, description = "Workspace", body = ApiResponse<WorkspaceDto>),
        (status = 403, description = "Not a member of this workspace", body = ApiError),
        (status = 404, description = "Workspace not found", body = ApiError)
    ),
    tag = "workspaces"
)]
pub async fn get_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<WorkspaceDto>>, ApiError> {
    if !user.is_admin() && user.workspace_id != Some(id) {
        return Err(forbidden(Some("Not a member of this workspace")));
    }

    let workspace = WorkspaceRepository::new(&state.db)
        .get(id)
        .await?
        .ok_or_else(|| not_found("Workspace not found"))?;
    Ok(Json(ApiResponse::new(workspace.into())))
}

/// Rename or (de)activate a workspace
#[utoipa::path(
    patch,
    path = "/api/v1/workspaces/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Workspace id")),
    request_body = UpdateWorkspaceRequest,
    responses(
        (status = 200, description = "Workspace updated", body = ApiResponse<WorkspaceDto>),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Workspace not found", body = ApiError)
    ),
    tag = "workspaces"
)]
pub async fn update_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateWorkspaceRequest>,
) -> Result<Json<ApiResponse<WorkspaceDto>>, ApiError> {
    user.require_admin()?;
    let workspace = WorkspaceRepository::new(&state.db)
        .update(
            id,
            UpdateWorkspace {
                name: body.name,
                is_active: body.is_active,
            },
        )
        .await?;
    Ok(Json(ApiResponse::new(workspace.into())))
}

/// Delete a workspace
#[utoipa::path(
    delete,
    path = "/api/v1/workspaces/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Workspace id")),
    responses(
        (status = 200, description = "Workspace deleted", body = ApiResponse<DeletedResponse>),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Workspace not found", body = ApiError)
    ),
    tag = "workspaces"
)]
pub async fn delete_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>, ApiError> {
    user.require_admin()?;
    WorkspaceRepository::new(&state.db).delete(id).await?;
    tracing::info!(workspace_id = %id, "Workspace deleted");
    Ok(Json(ApiResponse::new(DeletedResponse {
        id: id.to_string(),
        deleted: true,
    })))
}
