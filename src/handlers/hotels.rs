//! # Hotels API Handlers
//!
//! Hotel providers manage their own hotel records; admins see all of them.

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
use crate::error::{ApiError, not_found};
use crate::models::hotel;
use crate::models::profile::Role;
use crate::repositories::HotelRepository;
use crate::repositories::hotel::HotelInput;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HotelDto {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub provider_id: Uuid,
    #[schema(example = "Dar Al Tawhid")]
    pub name: String,
    #[schema(example = "Makkah")]
    pub city: String,
    #[schema(minimum = 1, maximum = 5)]
    pub star_rating: Option<i16>,
    pub address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<hotel::Model> for HotelDto {
    fn from(model: hotel::Model) -> Self {
        Self {
            id: model.id,
            provider_id: model.provider_id,
            name: model.name,
            city: model.city,
            star_rating: model.star_rating,
            address: model.address,
            created_at: rfc3339(model.created_at),
            updated_at: rfc3339(model.updated_at),
        }
    }
}

/// Create/replace payload for a hotel
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HotelRequest {
    pub name: String,
    pub city: String,
    pub star_rating: Option<i16>,
    pub address: Option<String>,
}

impl From<HotelRequest> for HotelInput {
    fn from(body: HotelRequest) -> Self {
        Self {
            name: body.name,
            city: body.city,
            star_rating: body.star_rating,
            address: body.address,
        }
    }
}

/// Loads a hotel the caller may manage: providers their own, admins any.
async fn load_owned(state: &AppState, user: &CurrentUser, id: Uuid) -> Result<hotel::Model, ApiError> {
    HotelRepository::new(&state.db)
        .get(id)
        .await?
        .filter(|hotel| user.is_admin() || hotel.provider_id == user.id)
        .ok_or_else(|| not_found("Hotel not found"))
}

/// Register a hotel
#[utoipa::path(
    post,
    path = "/api/v1/hotels",
    security(("bearer_auth" = [])),
    request_body = HotelRequest,
    responses(
        (status = 201, description = "Hotel created", body = ApiResponse<HotelDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Hotel provider role required", body = ApiError)
    ),
    tag = "hotels"
)]
pub async fn create_hotel(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<HotelRequest>,
) -> Result<(StatusCode, Json<ApiResponse<HotelDto>>), ApiError> {
    user.require_role(&[Role::HotelProvider])?;
    let hotel = HotelRepository::new(&state.db)
        .create(user.id, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(hotel.into()))))
}

/// List hotels: a provider's own, or all for admins
#[utoipa::path(
    get,
    path = "/api/v1/hotels",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Hotels", body = PaginatedResponse<HotelDto>),
        (status = 403, description = "Hotel provider or admin role required", body = ApiError)
    ),
    tag = "hotels"
)]
pub async fn list_hotels(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<HotelDto>>, ApiError> {
    user.require_role(&[Role::HotelProvider, Role::Admin, Role::SuperAdmin])?;
    let provider_filter = (!user.is_admin()).then_some(user.id);
    let page = HotelRepository::new(&state.db)
        .list(provider_filter, query.page_request()?)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, HotelDto::from)))
}

/// Get a hotel
#[utoipa::path(
    get,
    path = "/api/v1/hotels/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Hotel id")),
    responses(
        (status = 200, description = "Hotel", body = ApiResponse<HotelDto>),
        (status = 404, description = "Hotel not found", body = ApiError)
    ),
    tag = "hotels"
)]
pub async fn get_hotel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<HotelDto>>, ApiError> {
    let hotel = load_owned(&state, &user, id).await?;
    Ok(Json(ApiResponse::new(hotel.into())))
}

/// Replace a hotel's details
#[utoipa::path(
    put,
    path = "/api/v1/hotels/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Hotel id")),
    request_body = HotelRequest,
    responses(
        (status = 200, description = "Hotel updated", body = ApiResponse<HotelDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Hotel not found", body = ApiError)
    ),
    tag = "hotels"
)]
pub async fn update_hotel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<HotelRequest>,
) -> Result<Json<ApiResponse<HotelDto>>, ApiError> {
    user.require_role(&[Role::HotelProvider])?;
    let existing = load_owned(&state, &user, id).await?;
    let hotel = HotelRepository::new(&state.db)
        .update(existing, body.into())
        .await?;
    Ok(Json(ApiResponse::new(hotel.into())))
}

/// Delete a hotel. Offerings keep their copied hotel name.
#[utoipa::path(
    delete,
    path = "/api/v1/hotels/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Hotel id")),
    responses(
        (status = 200, description = "Hotel deleted", body = ApiResponse<DeletedResponse>),
        (status = 404, description = "Hotel not found", body = ApiError)
    ),
    tag = "hotels"
)]
pub async fn delete_hotel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>, ApiError> {
    user.require_role(&[Role::HotelProvider, Role::Admin, Role::SuperAdmin])?;
    let existing = load_owned(&state, &user, id).await?;
    HotelRepository::new(&state.db).delete(existing).await?;
    Ok(Json(ApiResponse::new(DeletedResponse {
        id: id.to_string(),
        deleted: true,
    })))
}
