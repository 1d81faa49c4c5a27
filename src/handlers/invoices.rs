//! # Invoices API Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::extract::JsonBody;
use super::types::{ApiResponse, PaginatedResponse, rfc3339};
use crate::auth::CurrentUser;
use crate::cursor::PageRequest;
use crate::error::{ApiError, not_found};
use crate::invoicing::InvoiceService;
use crate::models::invoice::{self, InvoiceStatus};
use crate::repositories::InvoiceRepository;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceDto {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(example = "INV-20250307-3F2A9C10")]
    pub invoice_number: String,
    #[schema(value_type = String)]
    pub workspace_id: Uuid,
    #[schema(value_type = String)]
    pub request_id: Uuid,
    #[schema(value_type = String)]
    pub offering_id: Uuid,
    /// Minor units
    pub amount: i64,
    /// Minor units
    pub commission_amount: i64,
    #[schema(example = "SAR")]
    pub currency: String,
    pub status: InvoiceStatus,
    pub issued_at: Option<String>,
    pub paid_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<invoice::Model> for InvoiceDto {
    fn from(model: invoice::Model) -> Self {
        Self {
            id: model.id,
            invoice_number: model.invoice_number,
            workspace_id: model.workspace_id,
            request_id: model.request_id,
            offering_id: model.offering_id,
            amount: model.amount,
            commission_amount: model.commission_amount,
            currency: model.currency,
            status: model.status,
            issued_at: model.issued_at.map(rfc3339),
            paid_at: model.paid_at.map(rfc3339),
            created_at: rfc3339(model.created_at),
            updated_at: rfc3339(model.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateInvoiceRequest {
    /// A confirmed offering without an invoice
    #[schema(value_type = String)]
    pub offering_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceTransitionRequest {
    pub status: InvoiceStatus,
}

#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListInvoicesQuery {
    pub status: Option<InvoiceStatus>,
    pub limit: Option<u64>,
    pub cursor: Option<String>,
}

/// Invoice a confirmed offering
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    security(("bearer_auth" = [])),
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Draft invoice created", body = ApiResponse<InvoiceDto>),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Offering not found", body = ApiError),
        (status = 409, description = "Offering not confirmed or already invoiced", body = ApiError)
    ),
    tag = "invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InvoiceDto>>), ApiError> {
    user.require_admin()?;
    let invoice = InvoiceService::new(&state.db, state.config.currency.clone())
        .create_from_offering(body.offering_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(invoice.into()))))
}

/// List invoices visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    security(("bearer_auth" = [])),
    params(ListInvoicesQuery),
    responses(
        (status = 200, description = "Invoices", body = PaginatedResponse<InvoiceDto>)
    ),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<PaginatedResponse<InvoiceDto>>, ApiError> {
    let page = PageRequest::from_query(query.cursor.as_deref(), query.limit)?;
    let page = InvoiceRepository::new(&state.db)
        .list(user.scope(), query.status, page)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, InvoiceDto::from)))
}

/// Get an invoice
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice", body = ApiResponse<InvoiceDto>),
        (status = 404, description = "Invoice not found or not visible", body = ApiError)
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InvoiceDto>>, ApiError> {
    let invoice = InvoiceRepository::new(&state.db)
        .get_visible(user.scope(), id)
        .await?
        .ok_or_else(|| not_found("Invoice not found"))?;
    Ok(Json(ApiResponse::new(invoice.into())))
}

/// Move an invoice to its next status
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/status",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Invoice id")),
    request_body = InvoiceTransitionRequest,
    responses(
        (status = 200, description = "Invoice updated", body = ApiResponse<InvoiceDto>),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Invoice not found", body = ApiError),
        (status = 409, description = "Transition not allowed", body = ApiError)
    ),
    tag = "invoices"
)]
pub async fn transition_invoice(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<InvoiceTransitionRequest>,
) -> Result<Json<ApiResponse<InvoiceDto>>, ApiError> {
    user.require_admin()?;
    let repo = InvoiceRepository::new(&state.db);
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| not_found("Invoice not found"))?;
    let invoice = repo.transition(existing, body.status).await?;
    tracing::info!(invoice_id = %invoice.id, status = ?invoice.status, "Invoice status changed");
    Ok(Json(ApiResponse::new(invoice.into())))
}
