//! # Dashboard Statistics

use std::collections::BTreeMap;

use axum::{extract::State, response::Json};
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::types::ApiResponse;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::models::offering::OfferingStatus;
use crate::models::request::RequestStatus;
use crate::repositories::{OfferingRepository, RequestRepository};
use crate::server::AppState;

/// Row counts per lifecycle status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    #[schema(example = json!({"Submitted": 4, "Quoted": 2, "Confirmed": 7}))]
    pub requests: BTreeMap<String, u64>,
    #[schema(example = json!({"PENDING": 6, "CONFIRMED": 7, "CANCELED": 3}))]
    pub offerings: BTreeMap<String, u64>,
}

fn status_key<T: Serialize>(status: &T) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Request and offering counts per status
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard counts", body = ApiResponse<DashboardStats>),
        (status = 403, description = "Admin role required", body = ApiError)
    ),
    tag = "stats"
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    user.require_admin()?;

    let requests_repo = RequestRepository::new(&state.db);
    let mut requests = BTreeMap::new();
    for status in RequestStatus::iter() {
        let count = requests_repo.count_by_status(status).await?;
        requests.insert(status_key(&status), count);
    }

    let offerings_repo = OfferingRepository::new(&state.db);
    let mut offerings = BTreeMap::new();
    for status in OfferingStatus::iter() {
        let count = offerings_repo.count_by_status(status).await?;
        offerings.insert(status_key(&status), count);
    }

    Ok(Json(ApiResponse::new(DashboardStats {
        requests,
        offerings,
    })))
}
