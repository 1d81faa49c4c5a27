//! # Notifications API Handlers
//!
//! The caller's own notification feed.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::types::{ApiResponse, PaginatedResponse, rfc3339};
use crate::auth::CurrentUser;
use crate::cursor::PageRequest;
use crate::error::ApiError;
use crate::models::notification::{self, NotificationKind};
use crate::repositories::NotificationRepository;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationDto {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[schema(value_type = Option<String>)]
    pub request_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub offering_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: String,
}

impl From<notification::Model> for NotificationDto {
    fn from(model: notification::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            title: model.title,
            message: model.message,
            request_id: model.request_id,
            offering_id: model.offering_id,
            is_read: model.is_read,
            created_at: rfc3339(model.created_at),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListNotificationsQuery {
    /// Only unread notifications
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<u64>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnreadCount {
    pub unread: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// List the caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    security(("bearer_auth" = [])),
    params(ListNotificationsQuery),
    responses(
        (status = 200, description = "Notifications", body = PaginatedResponse<NotificationDto>)
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<PaginatedResponse<NotificationDto>>, ApiError> {
    let page = PageRequest::from_query(query.cursor.as_deref(), query.limit)?;
    let page = NotificationRepository::new(&state.db)
        .list(user.id, query.unread_only, page)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, NotificationDto::from)))
}

/// Number of unread notifications
#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread-count",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unread count", body = ApiResponse<UnreadCount>)
    ),
    tag = "notifications"
)]
pub async fn unread_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<UnreadCount>>, ApiError> {
    let unread = NotificationRepository::new(&state.db)
        .unread_count(user.id)
        .await?;
    Ok(Json(ApiResponse::new(UnreadCount { unread })))
}

/// Mark one notification read
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked read", body = ApiResponse<NotificationDto>),
        (status = 404, description = "Notification not found", body = ApiError)
    ),
    tag = "notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<NotificationDto>>, ApiError> {
    let notification = NotificationRepository::new(&state.db)
        .mark_read(user.id, id)
        .await?;
    Ok(Json(ApiResponse::new(notification.into())))
}

/// Mark every notification read
#[utoipa::path(
    post,
    path = "/api/v1/notifications/read-all",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notifications marked read", body = ApiResponse<MarkAllReadResponse>)
    ),
    tag = "notifications"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<MarkAllReadResponse>>, ApiError> {
    let updated = NotificationRepository::new(&state.db)
        .mark_all_read(user.id)
        .await?;
    Ok(Json(ApiResponse::new(MarkAllReadResponse { updated })))
}
