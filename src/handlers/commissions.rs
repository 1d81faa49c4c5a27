//! # Commissions API Handlers
//!
//! Admin-managed commission rates per workspace. Agents may read their own.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::extract::JsonBody;
use super::types::{ApiResponse, DeletedResponse, PaginatedResponse, rfc3339};
use crate::auth::CurrentUser;
use crate::cursor::PageRequest;
use crate::error::{ApiError, not_found};
use crate::models::commission;
use crate::models::profile::Role;
use crate::repositories::commission::{NewCommission, UpdateCommission};
use crate::repositories::{CommissionRepository, WorkspaceRepository};
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommissionDto {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub workspace_id: Uuid,
    #[schema(example = 5.0)]
    pub rate_percent: f64,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<commission::Model> for CommissionDto {
    fn from(model: commission::Model) -> Self {
        Self {
            id: model.id,
            workspace_id: model.workspace_id,
            rate_percent: model.rate_percent,
            is_active: model.is_active,
            notes: model.notes,
            created_at: rfc3339(model.created_at),
            updated_at: rfc3339(model.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCommissionRequest {
    #[schema(value_type = String)]
    pub workspace_id: Uuid,
    pub rate_percent: f64,
    /// Activating deactivates the workspace's other rates (default true)
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub notes: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCommissionRequest {
    pub rate_percent: Option<f64>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCommissionsQuery {
    #[param(value_type = Option<String>)]
    pub workspace_id: Option<Uuid>,
    pub limit: Option<u64>,
    pub cursor: Option<String>,
}

/// Create a commission rate
#[utoipa::path(
    post,
    path = "/api/v1/commissions",
    security(("bearer_auth" = [])),
    request_body = CreateCommissionRequest,
    responses(
        (status = 201, description = "Commission created", body = ApiResponse<CommissionDto>),
        (status = 400, description = "Rate outside 0..=100", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Workspace not found", body = ApiError)
    ),
    tag = "commissions"
)]
pub async fn create_commission(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<CreateCommissionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CommissionDto>>), ApiError> {
    user.require_admin()?;
    WorkspaceRepository::new(&state.db)
        .get(body.workspace_id)
        .await?
        .ok_or_else(|| not_found("Workspace not found"))?;

    let commission = CommissionRepository::new(&state.db)
        .create(NewCommission {
            workspace_id: body.workspace_id,
            rate_percent: body.rate_percent,
            is_active: body.is_active,
            notes: body.notes,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(commission.into()))))
}

/// List commission rates; agents only see their workspace's
#[utoipa::path(
    get,
    path = "/api/v1/commissions",
    security(("bearer_auth" = [])),
    params(ListCommissionsQuery),
    responses(
        (status = 200, description = "Commissions", body = PaginatedResponse<CommissionDto>),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "commissions"
)]
pub async fn list_commissions(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListCommissionsQuery>,
) -> Result<Json<PaginatedResponse<CommissionDto>>, ApiError> {
    let workspace_filter = match user.role {
        Role::Admin | Role::SuperAdmin => query.workspace_id,
        _ => Some(user.require_workspace()?),
    };
    let page = PageRequest::from_query(query.cursor.as_deref(), query.limit)?;
    let page = CommissionRepository::new(&state.db)
        .list(workspace_filter, page)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, CommissionDto::from)))
}

/// Change a commission rate
#[utoipa::path(
    patch,
    path = "/api/v1/commissions/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Commission id")),
    request_body = UpdateCommissionRequest,
    responses(
        (status = 200, description = "Commission updated", body = ApiResponse<CommissionDto>),
        (status = 400, description = "Rate outside 0..=100", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Commission not found", body = ApiError)
    ),
    tag = "commissions"
)]
pub async fn update_commission(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateCommissionRequest>,
) -> Result<Json<ApiResponse<CommissionDto>>, ApiError> {
    user.require_admin()?;
    let commission = CommissionRepository::new(&state.db)
        .update(
            id,
            UpdateCommission {
                rate_percent: body.rate_percent,
                is_active: body.is_active,
                notes: body.notes,
            },
        )
        .await?;
    Ok(Json(ApiResponse::new(commission.into())))
}

/// Delete a commission rate
#[utoipa::path(
    delete,
    path = "/api/v1/commissions/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Commission id")),
    responses(
        (status = 200, description = "Commission deleted", body = ApiResponse<DeletedResponse>),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Commission not found", body = ApiError)
    ),
    tag = "commissions"
)]
pub async fn delete_commission(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>, ApiError> {
    user.require_admin()?;
    CommissionRepository::new(&state.db).delete(id).await?;
    Ok(Json(ApiResponse::new(DeletedResponse {
        id: id.to_string(),
        deleted: true,
    })))
}
