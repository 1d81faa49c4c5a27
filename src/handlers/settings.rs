//! # Settings API Handlers

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::extract::JsonBody;
use super::types::{ApiResponse, rfc3339};
use crate::auth::CurrentUser;
use crate::error::{ApiError, not_found};
use crate::models::setting;
use crate::repositories::SettingRepository;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingDto {
    #[schema(example = "default_margin_percent")]
    pub key: String,
    #[schema(value_type = Object, example = 10.0)]
    pub value: serde_json::Value,
    pub description: Option<String>,
    pub updated_at: String,
}

impl From<setting::Model> for SettingDto {
    fn from(model: setting::Model) -> Self {
        Self {
            key: model.key,
            value: model.value,
            description: model.description,
            updated_at: rfc3339(model.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpsertSettingRequest {
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
    pub description: Option<String>,
}

/// List all settings
#[utoipa::path(
    get,
    path = "/api/v1/settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Settings", body = ApiResponse<Vec<SettingDto>>),
        (status = 403, description = "Admin role required", body = ApiError)
    ),
    tag = "settings"
)]
pub async fn list_settings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<SettingDto>>>, ApiError> {
    user.require_admin()?;
    let settings = SettingRepository::new(&state.db).list().await?;
    Ok(Json(ApiResponse::new(
        settings.into_iter().map(SettingDto::from).collect(),
    )))
}

/// Get one setting
#[utoipa::path(
    get,
    path = "/api/v1/settings/{key}",
    security(("bearer_auth" = [])),
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting", body = ApiResponse<SettingDto>),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Setting not found", body = ApiError)
    ),
    tag = "settings"
)]
pub async fn get_setting(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<SettingDto>>, ApiError> {
    user.require_admin()?;
    let setting = SettingRepository::new(&state.db)
        .get(&key)
        .await?
        .ok_or_else(|| not_found("Setting not found"))?;
    Ok(Json(ApiResponse::new(setting.into())))
}

/// Create or replace a setting
#[utoipa::path(
    put,
    path = "/api/v1/settings/{key}",
    security(("bearer_auth" = [])),
    params(("key" = String, Path, description = "Setting key")),
    request_body = UpsertSettingRequest,
    responses(
        (status = 200, description = "Setting stored", body = ApiResponse<SettingDto>),
        (status = 400, description = "Value has the wrong type for this key", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError)
    ),
    tag = "settings"
)]
pub async fn upsert_setting(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(key): Path<String>,
    JsonBody(body): JsonBody<UpsertSettingRequest>,
) -> Result<Json<ApiResponse<SettingDto>>, ApiError> {
    user.require_admin()?;
    let setting = SettingRepository::new(&state.db)
        .upsert(&key, body.value, body.description)
        .await?;
    tracing::info!(key = %setting.key, "Setting updated");
    Ok(Json(ApiResponse::new(setting.into())))
}
