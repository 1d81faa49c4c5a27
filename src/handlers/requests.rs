//! # Requests API Handlers
//!
//! Travel agents submit and maintain accommodation requests; providers browse
//! open requests to bid on; admins see everything.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::extract::JsonBody;
use super::types::{ApiResponse, DeletedResponse, PaginatedResponse, rfc3339};
use crate::auth::CurrentUser;
use crate::cursor::PageRequest;
use crate::error::{ApiError, forbidden, not_found};
use crate::models::notification::NotificationKind;
use crate::models::profile::Role;
use crate::models::request::{self, PackageType, RequestStatus};
use crate::pricing::RoomCounts;
use crate::repositories::notification::NewNotification;
use crate::repositories::request::{NewRequest, UpdateRequest};
use crate::repositories::{NotificationRepository, ProfileRepository, RequestRepository};
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequestDto {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub workspace_id: Uuid,
    #[schema(value_type = String)]
    pub created_by: Uuid,
    #[schema(example = "Madinah")]
    pub city: String,
    #[schema(value_type = String, example = "2025-03-01")]
    pub check_in: NaiveDate,
    #[schema(value_type = String, example = "2025-03-05")]
    pub check_out: NaiveDate,
    pub nights: i64,
    pub rooms: RoomCounts,
    pub package_type: PackageType,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<request::Model> for RequestDto {
    fn from(model: request::Model) -> Self {
        Self {
            id: model.id,
            workspace_id: model.workspace_id,
            created_by: model.created_by,
            nights: model.nights().unwrap_or_default(),
            rooms: model.room_counts(),
            city: model.city,
            check_in: model.check_in,
            check_out: model.check_out,
            package_type: model.package_type,
            notes: model.notes,
            status: model.status,
            created_at: rfc3339(model.created_at),
            updated_at: rfc3339(model.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRequestBody {
    pub city: String,
    #[schema(value_type = String, example = "2025-03-01")]
    pub check_in: NaiveDate,
    #[schema(value_type = String, example = "2025-03-05")]
    pub check_out: NaiveDate,
    pub rooms: RoomCounts,
    pub package_type: PackageType,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRequestBody {
    pub city: Option<String>,
    #[schema(value_type = Option<String>)]
    pub check_in: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub check_out: Option<NaiveDate>,
    pub rooms: Option<RoomCounts>,
    pub package_type: Option<PackageType>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRequestsQuery {
    /// Only requests in this status
    pub status: Option<RequestStatus>,
    pub limit: Option<u64>,
    pub cursor: Option<String>,
}

/// Submit a request
#[utoipa::path(
    post,
    path = "/api/v1/requests",
    security(("bearer_auth" = [])),
    request_body = CreateRequestBody,
    responses(
        (status = 201, description = "Request submitted", body = ApiResponse<RequestDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Travel agent role required", body = ApiError)
    ),
    tag = "requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<CreateRequestBody>,
) -> Result<(StatusCode, Json<ApiResponse<RequestDto>>), ApiError> {
    let workspace_id = user.require_workspace()?;

    let txn = state.db.begin().await?;
    let request = RequestRepository::new(&txn)
        .create(
            workspace_id,
            user.id,
            NewRequest {
                city: body.city,
                check_in: body.check_in,
                check_out: body.check_out,
                rooms: body.rooms,
                package_type: body.package_type,
                notes: body.notes,
            },
        )
        .await?;

    let admins = ProfileRepository::new(&txn).admin_ids().await?;
    let notifications = admins
        .into_iter()
        .map(|admin_id| NewNotification {
            recipient_id: admin_id,
            kind: NotificationKind::RequestSubmitted,
            title: "New accommodation request".to_string(),
            message: format!(
                "{} request for {} to {}",
                request.city, request.check_in, request.check_out
            ),
            request_id: Some(request.id),
            offering_id: None,
        })
        .collect();
    NotificationRepository::new(&txn)
        .create_many(notifications)
        .await?;
    txn.commit().await?;

    metrics::counter!("sakina_requests_submitted_total").increment(1);
    tracing::info!(request_id = %request.id, %workspace_id, "Request submitted");

    Ok((StatusCode::CREATED, Json(ApiResponse::new(request.into()))))
}

/// List requests visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/requests",
    security(("bearer_auth" = [])),
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "Requests", body = PaginatedResponse<RequestDto>),
        (status = 400, description = "Invalid pagination parameters", body = ApiError)
    ),
    tag = "requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<PaginatedResponse<RequestDto>>, ApiError> {
    let page = PageRequest::from_query(query.cursor.as_deref(), query.limit)?;
    let page = RequestRepository::new(&state.db)
        .list(user.scope(), query.status, page)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, RequestDto::from)))
}

/// Get a request
#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request", body = ApiResponse<RequestDto>),
        (status = 404, description = "Request not found or not visible", body = ApiError)
    ),
    tag = "requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RequestDto>>, ApiError> {
    let request = RequestRepository::new(&state.db)
        .get_visible(user.scope(), id)
        .await?
        .ok_or_else(|| not_found("Request not found"))?;
    Ok(Json(ApiResponse::new(request.into())))
}

/// Loads a request the caller may edit: agents within their workspace, or admins.
async fn load_editable<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    id: Uuid,
) -> Result<request::Model, ApiError> {
    user.require_role(&[Role::TravelAgent, Role::Admin, Role::SuperAdmin])?;
    let request = RequestRepository::new(db)
        .get_visible(user.scope(), id)
        .await?
        .ok_or_else(|| not_found("Request not found"))?;
    if !user.is_admin() && user.workspace_id != Some(request.workspace_id) {
        return Err(forbidden(Some("Request belongs to another workspace")));
    }
    Ok(request)
}

/// Edit a request while it is still Submitted
#[utoipa::path(
    patch,
    path = "/api/v1/requests/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Request id")),
    request_body = UpdateRequestBody,
    responses(
        (status = 200, description = "Request updated", body = ApiResponse<RequestDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Request not found", body = ApiError),
        (status = 409, description = "Request already quoted or confirmed, or has pending offerings", body = ApiError)
    ),
    tag = "requests"
)]
pub async fn update_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateRequestBody>,
) -> Result<Json<ApiResponse<RequestDto>>, ApiError> {
    let txn = state.db.begin().await?;
    let existing = load_editable(&txn, &user, id).await?;
    let request = RequestRepository::new(&txn)
        .update(
            existing,
            UpdateRequest {
                city: body.city,
                check_in: body.check_in,
                check_out: body.check_out,
                rooms: body.rooms,
                package_type: body.package_type,
                notes: body.notes,
            },
        )
        .await?;
    txn.commit().await?;
    Ok(Json(ApiResponse::new(request.into())))
}

/// Withdraw a request while it is still Submitted; its offerings go with it
#[utoipa::path(
    delete,
    path = "/api/v1/requests/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request deleted", body = ApiResponse<DeletedResponse>),
        (status = 404, description = "Request not found", body = ApiError),
        (status = 409, description = "Request already quoted or confirmed", body = ApiError)
    ),
    tag = "requests"
)]
pub async fn delete_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>, ApiError> {
    let txn = state.db.begin().await?;
    let existing = load_editable(&txn, &user, id).await?;
    RequestRepository::new(&txn).delete(existing).await?;
    txn.commit().await?;
    tracing::info!(request_id = %id, "Request deleted");
    Ok(Json(ApiResponse::new(DeletedResponse {
        id: id.to_string(),
        deleted: true,
    })))
}
