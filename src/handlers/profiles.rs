//! # Profiles API Handlers
//!
//! The caller's own profile plus admin user management.

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
use crate::error::{ApiError, forbidden, not_found};
use crate::models::profile::{self, Role};
use crate::repositories::ProfileRepository;
use crate::repositories::profile::{NewProfile, UpdateProfile};
use crate::server::AppState;

/// Profile as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileDto {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(example = "agent@niletravel.example")]
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    #[schema(value_type = Option<String>)]
    pub workspace_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<profile::Model> for ProfileDto {
    fn from(model: profile::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            workspace_id: model.workspace_id,
            created_at: rfc3339(model.created_at),
            updated_at: rfc3339(model.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateProfileRequest {
    /// Identity subject from the token issuer; generated when omitted
    #[schema(value_type = Option<String>)]
    pub id: Option<Uuid>,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    /// Required for travel agents, rejected for other roles
    #[schema(value_type = Option<String>)]
    pub workspace_id: Option<Uuid>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    /// Explicit `null` detaches the profile from its workspace
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub workspace_id: Option<Option<Uuid>>,
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProfilesQuery {
    /// Only profiles with this role
    pub role: Option<Role>,
    pub limit: Option<u64>,
    pub cursor: Option<String>,
}

/// Only super admins may grant or hold the super admin role.
fn ensure_can_assign(user: &CurrentUser, role: Role) -> Result<(), ApiError> {
    if role == Role::SuperAdmin && user.role != Role::SuperAdmin {
        return Err(forbidden(Some(
            "Only super admins can assign the super_admin role",
        )));
    }
    Ok(())
}

/// The authenticated caller's profile
#[utoipa::path(
    get,
    path = "/api/v1/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller profile", body = ApiResponse<ProfileDto>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "profiles"
)]
pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<ProfileDto>>, ApiError> {
    let profile = ProfileRepository::new(&state.db)
        .get(user.id)
        .await?
        .ok_or_else(|| not_found("Profile not found"))?;
    Ok(Json(ApiResponse::new(profile.into())))
}

/// Create a profile
#[utoipa::path(
    post,
    path = "/api/v1/profiles",
    security(("bearer_auth" = [])),
    request_body = CreateProfileRequest,
    responses(
        (status = 201, description = "Profile created", body = ApiResponse<ProfileDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "profiles"
)]
pub async fn create_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<CreateProfileRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProfileDto>>), ApiError> {
    user.require_admin()?;
    ensure_can_assign(&user, body.role)?;

    let profile = ProfileRepository::new(&state.db)
        .create(NewProfile {
            id: body.id,
            email: body.email,
            full_name: body.full_name,
            role: body.role,
            workspace_id: body.workspace_id,
        })
        .await?;
    tracing::info!(profile_id = %profile.id, role = %profile.role, "Profile created");

    Ok((StatusCode::CREATED, Json(ApiResponse::new(profile.into()))))
}

/// List profiles
#[utoipa::path(
    get,
    path = "/api/v1/profiles",
    security(("bearer_auth" = [])),
    params(ListProfilesQuery),
    responses(
        (status = 200, description = "Profiles", body = PaginatedResponse<ProfileDto>),
        (status = 403, description = "Admin role required", body = ApiError)
    ),
    tag = "profiles"
)]
pub async fn list_profiles(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListProfilesQuery>,
) -> Result<Json<PaginatedResponse<ProfileDto>>, ApiError> {
    user.require_admin()?;
    let page = PageRequest::from_query(query.cursor.as_deref(), query.limit)?;
    let page = ProfileRepository::new(&state.db)
        .list(query.role, page)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, ProfileDto::from)))
}

/// Get a profile
#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile", body = ApiResponse<ProfileDto>),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Profile not found", body = ApiError)
    ),
    tag = "profiles"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProfileDto>>, ApiError> {
    if user.id != id {
        user.require_admin()?;
    }
    let profile = ProfileRepository::new(&state.db)
        .get(id)
        .await?
        .ok_or_else(|| not_found("Profile not found"))?;
    Ok(Json(ApiResponse::new(profile.into())))
}

/// Update a profile's name, role or workspace
#[utoipa::path(
    patch,
    path = "/api/v1/profiles/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Profile id")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<ProfileDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Profile not found", body = ApiError)
    ),
    tag = "profiles"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileDto>>, ApiError> {
    let self_service = user.id == id && body.role.is_none() && body.workspace_id.is_none();
    if !self_service {
        user.require_admin()?;
    }

    let repo = ProfileRepository::new(&state.db);
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| not_found("Profile not found"))?;
    if existing.role == Role::SuperAdmin && user.role != Role::SuperAdmin {
        return Err(forbidden(Some("Only super admins can modify super admins")));
    }
    if let Some(role) = body.role {
        ensure_can_assign(&user, role)?;
    }

    let profile = repo
        .update(
            id,
            UpdateProfile {
                full_name: body.full_name,
                role: body.role,
                workspace_id: body.workspace_id,
            },
        )
        .await?;
    Ok(Json(ApiResponse::new(profile.into())))
}

/// Delete a profile
#[utoipa::path(
    delete,
    path = "/api/v1/profiles/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile deleted", body = ApiResponse<DeletedResponse>),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Profile not found", body = ApiError),
        (status = 409, description = "Profile has requests or offerings on record", body = ApiError)
    ),
    tag = "profiles"
)]
pub async fn delete_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>, ApiError> {
    user.require_admin()?;
    if user.id == id {
        return Err(forbidden(Some("Admins cannot delete their own profile")));
    }

    let repo = ProfileRepository::new(&state.db);
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| not_found("Profile not found"))?;
    ensure_can_assign(&user, existing.role)?;

    repo.delete(id).await?;
    Ok(Json(ApiResponse::new(DeletedResponse {
        id: id.to_string(),
        deleted: true,
    })))
}
