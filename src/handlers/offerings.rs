//! # Offerings API Handlers
//!
//! Provider bids and the admin quote/confirm workflow. What an offering
//! exposes depends on who is looking: agents only ever see final prices,
//! providers see what they bid, admins see everything.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::requests::RequestDto;
use super::extract::JsonBody;
use super::types::{ApiResponse, PaginatedResponse, rfc3339};
use crate::auth::CurrentUser;
use crate::bidding::{BiddingService, OfferingInput, OfferingPriceUpdate};
use crate::cursor::PageRequest;
use crate::error::{ApiError, not_found};
use crate::models::offering::{self, OfferingStatus};
use crate::models::profile::Role;
use crate::pricing::RoomPrices;
use crate::repositories::offering::OfferingFilter;
use crate::repositories::{OfferingRepository, RequestRepository};
use crate::server::AppState;

/// Offering as seen by the caller. Fields the caller may not see are null.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OfferingDto {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub request_id: Uuid,
    #[schema(value_type = Option<String>)]
    pub provider_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub hotel_id: Option<Uuid>,
    pub hotel_name: String,
    /// Provider nightly prices; hidden from travel agents
    pub base_prices: Option<RoomPrices>,
    /// Admin margin in percent; admins only
    pub margin_percent: Option<f64>,
    /// Customer-facing nightly prices, once quoted
    pub final_prices: Option<RoomPrices>,
    /// Whole-stay cost at base prices; hidden from travel agents
    pub total_base_price: Option<i64>,
    /// Whole-stay cost at final prices, once quoted
    pub total_final_price: Option<i64>,
    pub status: OfferingStatus,
    pub notes: Option<String>,
    pub quoted_at: Option<String>,
    pub confirmed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl OfferingDto {
    pub fn for_viewer(model: offering::Model, role: Role) -> Self {
        let quoted = model.is_quoted();
        let final_prices = quoted.then(|| model.final_prices());
        let (provider_id, base_prices, total_base_price) = match role {
            Role::TravelAgent => (None, None, None),
            _ => (
                Some(model.provider_id),
                Some(model.base_prices()),
                Some(model.total_base_price),
            ),
        };
        let margin_percent = if role.is_admin() {
            model.margin_percent
        } else {
            None
        };

        Self {
            id: model.id,
            request_id: model.request_id,
            provider_id,
            hotel_id: model.hotel_id,
            hotel_name: model.hotel_name,
            base_prices,
            margin_percent,
            final_prices,
            total_base_price,
            total_final_price: model.total_final_price,
            status: model.status,
            notes: model.notes,
            quoted_at: model.quoted_at.map(rfc3339),
            confirmed_at: model.confirmed_at.map(rfc3339),
            created_at: rfc3339(model.created_at),
            updated_at: rfc3339(model.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitOfferingRequest {
    /// One of the provider's registered hotels
    #[schema(value_type = Option<String>)]
    pub hotel_id: Option<Uuid>,
    /// Free-text hotel name, used when `hotel_id` is absent
    pub hotel_name: Option<String>,
    /// Nightly price per room in minor units, for every requested category
    pub prices: RoomPrices,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateOfferingPricesRequest {
    pub prices: RoomPrices,
    pub notes: Option<String>,
}

/// Optional margin for quote and confirm; defaults to the stored setting
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct MarginRequest {
    #[schema(example = 12.5)]
    pub margin_percent: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuoteResponse {
    pub offering: OfferingDto,
    pub request: RequestDto,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfirmResponse {
    pub offering: OfferingDto,
    pub request: RequestDto,
    /// Sibling offerings canceled by this confirmation
    #[schema(value_type = Vec<String>)]
    pub canceled_offering_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOfferingsQuery {
    #[param(value_type = Option<String>)]
    pub request_id: Option<Uuid>,
    pub status: Option<OfferingStatus>,
    pub limit: Option<u64>,
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestOfferingsQuery {
    pub status: Option<OfferingStatus>,
    pub limit: Option<u64>,
    pub cursor: Option<String>,
}

fn bidding(state: &AppState) -> BiddingService<'_> {
    BiddingService::new(&state.db, state.config.default_margin_percent)
}

/// Submit a bid on a request
#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/offerings",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Request id")),
    request_body = SubmitOfferingRequest,
    responses(
        (status = 201, description = "Offering submitted", body = ApiResponse<OfferingDto>),
        (status = 400, description = "Missing or invalid prices", body = ApiError),
        (status = 403, description = "Hotel provider role required", body = ApiError),
        (status = 404, description = "Request not found", body = ApiError),
        (status = 409, description = "Request confirmed or provider already bidding", body = ApiError)
    ),
    tag = "offerings"
)]
pub async fn submit_offering(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(request_id): Path<Uuid>,
    JsonBody(body): JsonBody<SubmitOfferingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OfferingDto>>), ApiError> {
    let offering = bidding(&state)
        .submit_offering(
            &user,
            request_id,
            OfferingInput {
                hotel_id: body.hotel_id,
                hotel_name: body.hotel_name,
                prices: body.prices,
                notes: body.notes,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(OfferingDto::for_viewer(offering, user.role))),
    ))
}

/// List the offerings on one request that the caller may see
#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}/offerings",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Request id"), RequestOfferingsQuery),
    responses(
        (status = 200, description = "Offerings", body = PaginatedResponse<OfferingDto>),
        (status = 404, description = "Request not found", body = ApiError)
    ),
    tag = "offerings"
)]
pub async fn list_request_offerings(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(request_id): Path<Uuid>,
    Query(query): Query<RequestOfferingsQuery>,
) -> Result<Json<PaginatedResponse<OfferingDto>>, ApiError> {
    let scope = user.scope();
    RequestRepository::new(&state.db)
        .get_visible(scope, request_id)
        .await?
        .ok_or_else(|| not_found("Request not found"))?;

    let page = PageRequest::from_query(query.cursor.as_deref(), query.limit)?;
    let filter = OfferingFilter {
        request_id: Some(request_id),
        status: query.status,
    };
    let page = OfferingRepository::new(&state.db)
        .list(scope, filter, page)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, |o| {
        OfferingDto::for_viewer(o, user.role)
    })))
}

/// List offerings visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/offerings",
    security(("bearer_auth" = [])),
    params(ListOfferingsQuery),
    responses(
        (status = 200, description = "Offerings", body = PaginatedResponse<OfferingDto>),
        (status = 400, description = "Invalid pagination parameters", body = ApiError)
    ),
    tag = "offerings"
)]
pub async fn list_offerings(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListOfferingsQuery>,
) -> Result<Json<PaginatedResponse<OfferingDto>>, ApiError> {
    let page = PageRequest::from_query(query.cursor.as_deref(), query.limit)?;
    let filter = OfferingFilter {
        request_id: query.request_id,
        status: query.status,
    };
    let page = OfferingRepository::new(&state.db)
        .list(user.scope(), filter, page)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, |o| {
        OfferingDto::for_viewer(o, user.role)
    })))
}

/// Get an offering
#[utoipa::path(
    get,
    path = "/api/v1/offerings/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Offering id")),
    responses(
        (status = 200, description = "Offering", body = ApiResponse<OfferingDto>),
        (status = 404, description = "Offering not found or not visible", body = ApiError)
    ),
    tag = "offerings"
)]
pub async fn get_offering(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OfferingDto>>, ApiError> {
    let offering = OfferingRepository::new(&state.db)
        .get_visible(user.scope(), id)
        .await?
        .ok_or_else(|| not_found("Offering not found"))?;
    Ok(Json(ApiResponse::new(OfferingDto::for_viewer(
        offering, user.role,
    ))))
}

/// Revise a pending, unquoted bid
#[utoipa::path(
    put,
    path = "/api/v1/offerings/{id}/prices",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Offering id")),
    request_body = UpdateOfferingPricesRequest,
    responses(
        (status = 200, description = "Offering updated", body = ApiResponse<OfferingDto>),
        (status = 400, description = "Missing or invalid prices", body = ApiError),
        (status = 404, description = "Offering not found", body = ApiError),
        (status = 409, description = "Offering no longer editable", body = ApiError)
    ),
    tag = "offerings"
)]
pub async fn update_offering_prices(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateOfferingPricesRequest>,
) -> Result<Json<ApiResponse<OfferingDto>>, ApiError> {
    let offering = bidding(&state)
        .update_offering_prices(
            &user,
            id,
            OfferingPriceUpdate {
                prices: body.prices,
                notes: body.notes,
            },
        )
        .await?;
    Ok(Json(ApiResponse::new(OfferingDto::for_viewer(
        offering, user.role,
    ))))
}

/// Apply a margin to a pending bid, making it visible to the agency
#[utoipa::path(
    post,
    path = "/api/v1/offerings/{id}/margin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Offering id")),
    request_body = MarginRequest,
    responses(
        (status = 200, description = "Offering quoted", body = ApiResponse<QuoteResponse>),
        (status = 400, description = "Invalid margin", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Offering not found", body = ApiError),
        (status = 409, description = "Offering or request no longer open", body = ApiError)
    ),
    tag = "offerings"
)]
pub async fn apply_margin(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    body: Option<JsonBody<MarginRequest>>,
) -> Result<Json<ApiResponse<QuoteResponse>>, ApiError> {
    let margin = body.and_then(|JsonBody(b)| b.margin_percent);
    let outcome = bidding(&state).apply_margin(&user, id, margin).await?;
    Ok(Json(ApiResponse::new(QuoteResponse {
        offering: OfferingDto::for_viewer(outcome.offering, user.role),
        request: outcome.request.into(),
    })))
}

/// Confirm the winning bid; competing pending bids are canceled
#[utoipa::path(
    post,
    path = "/api/v1/offerings/{id}/confirm",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Offering id")),
    request_body = MarginRequest,
    responses(
        (status = 200, description = "Offering confirmed", body = ApiResponse<ConfirmResponse>),
        (status = 400, description = "Invalid margin", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Offering not found", body = ApiError),
        (status = 409, description = "Offering or request no longer open", body = ApiError)
    ),
    tag = "offerings"
)]
pub async fn confirm_offering(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    body: Option<JsonBody<MarginRequest>>,
) -> Result<Json<ApiResponse<ConfirmResponse>>, ApiError> {
    let margin = body.and_then(|JsonBody(b)| b.margin_percent);
    let outcome = bidding(&state).confirm_offering(&user, id, margin).await?;
    Ok(Json(ApiResponse::new(ConfirmResponse {
        offering: OfferingDto::for_viewer(outcome.offering, user.role),
        request: outcome.request.into(),
        canceled_offering_ids: outcome.canceled_offering_ids,
    })))
}

/// Withdraw one's own pending bid
#[utoipa::path(
    post,
    path = "/api/v1/offerings/{id}/withdraw",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Offering id")),
    responses(
        (status = 200, description = "Offering withdrawn", body = ApiResponse<OfferingDto>),
        (status = 404, description = "Offering not found", body = ApiError),
        (status = 409, description = "Offering is not pending", body = ApiError)
    ),
    tag = "offerings"
)]
pub async fn withdraw_offering(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OfferingDto>>, ApiError> {
    let offering = bidding(&state).withdraw_offering(&user, id).await?;
    Ok(Json(ApiResponse::new(OfferingDto::for_viewer(
        offering, user.role,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quoted_offering() -> offering::Model {
        let now = Utc::now();
        offering::Model {
            id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            hotel_id: None,
            hotel_name: "Al Safwah".to_string(),
            single_base_price: Some(10_000),
            double_base_price: None,
            triple_base_price: None,
            quad_base_price: None,
            margin_percent: Some(15.0),
            single_final_price: Some(11_500),
            double_final_price: None,
            triple_final_price: None,
            quad_final_price: None,
            total_base_price: 30_000,
            total_final_price: Some(34_500),
            status: OfferingStatus::Pending,
            notes: None,
            quoted_at: Some(now.into()),
            confirmed_at: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn agents_never_see_base_prices_or_margin() {
        let dto = OfferingDto::for_viewer(quoted_offering(), Role::TravelAgent);
        assert!(dto.base_prices.is_none());
        assert!(dto.total_base_price.is_none());
        assert!(dto.margin_percent.is_none());
        assert!(dto.provider_id.is_none());
        assert_eq!(dto.total_final_price, Some(34_500));
        assert_eq!(dto.final_prices.and_then(|p| p.single), Some(11_500));
    }

    #[test]
    fn providers_see_their_bid_but_not_the_margin() {
        let dto = OfferingDto::for_viewer(quoted_offering(), Role::HotelProvider);
        assert_eq!(dto.total_base_price, Some(30_000));
        assert!(dto.margin_percent.is_none());
    }

    #[test]
    fn admins_see_everything() {
        let dto = OfferingDto::for_viewer(quoted_offering(), Role::Admin);
        assert_eq!(dto.margin_percent, Some(15.0));
        assert_eq!(dto.base_prices.and_then(|p| p.single), Some(10_000));
    }

    #[test]
    fn unquoted_offering_has_no_final_prices() {
        let mut model = quoted_offering();
        model.margin_percent = None;
        model.total_final_price = None;
        let dto = OfferingDto::for_viewer(model, Role::Admin);
        assert!(dto.final_prices.is_none());
    }
}
