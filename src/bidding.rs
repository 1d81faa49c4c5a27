//! # Bidding
//!
//! Offering lifecycle: providers submit and edit bids, admins quote them by
//! applying a margin and confirm a winner. Confirmation is one transaction:
//! the winner becomes CONFIRMED, every other PENDING bid on the request is
//! CANCELED and the request becomes Confirmed.

use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, IntoActiveModel, Set, TransactionTrait,
};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, RepositoryError, conflict, forbidden, not_found, validation_error};
use crate::models::notification::NotificationKind;
use crate::models::offering::{self, OfferingStatus};
use crate::models::profile::Role;
use crate::models::request::{self, RequestStatus};
use crate::pricing::{self, PricingError, RoomPrices};
use crate::repositories::notification::NewNotification;
use crate::repositories::{
    HotelRepository, NotificationRepository, OfferingRepository, ProfileRepository,
    RequestRepository, SettingRepository,
};

#[derive(Debug, Error)]
pub enum BiddingError {
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("request is already confirmed")]
    RequestClosed,
    #[error("provider already has a pending offering on this request")]
    DuplicateOffering,
    #[error("offering is {0:?}; only PENDING offerings can be changed")]
    OfferingNotPending(OfferingStatus),
    #[error("offering prices are locked once a margin has been applied")]
    PricesLocked,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl From<BiddingError> for ApiError {
    fn from(error: BiddingError) -> Self {
        match error {
            BiddingError::Forbidden(message) => forbidden(Some(&message)),
            BiddingError::NotFound(entity) => not_found(&format!("{} not found", entity)),
            BiddingError::RequestClosed
            | BiddingError::DuplicateOffering
            | BiddingError::OfferingNotPending(_)
            | BiddingError::PricesLocked => conflict(&error.to_string()),
            BiddingError::Validation(message) => {
                validation_error(&message, serde_json::json!({}))
            }
            BiddingError::Pricing(err) => err.into(),
            BiddingError::Repository(err) => err.into(),
            BiddingError::Database(err) => err.into(),
        }
    }
}

/// Provider input for a new bid
#[derive(Debug, Clone)]
pub struct OfferingInput {
    pub hotel_id: Option<Uuid>,
    pub hotel_name: Option<String>,
    pub prices: RoomPrices,
    pub notes: Option<String>,
}

/// Provider input for editing a bid before it is quoted
#[derive(Debug, Clone)]
pub struct OfferingPriceUpdate {
    pub prices: RoomPrices,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuoteOutcome {
    pub offering: offering::Model,
    pub request: request::Model,
}

#[derive(Debug, Clone)]
pub struct ConfirmOutcome {
    pub offering: offering::Model,
    pub canceled_offering_ids: Vec<Uuid>,
    pub request: request::Model,
}

/// Final prices derived from a margin
struct Quote {
    margin_percent: f64,
    final_prices: RoomPrices,
    total_final_price: i64,
}

fn quote(
    request: &request::Model,
    base_prices: &RoomPrices,
    margin_percent: f64,
) -> Result<Quote, PricingError> {
    pricing::validate_margin(margin_percent)?;
    let final_prices = pricing::apply_margin(base_prices, margin_percent)?;
    let total_final_price =
        pricing::stay_cost(&request.room_counts(), &final_prices, request.nights()?)?;
    Ok(Quote {
        margin_percent,
        final_prices,
        total_final_price,
    })
}

fn apply_quote(active: &mut offering::ActiveModel, quote: &Quote) {
    active.margin_percent = Set(Some(quote.margin_percent));
    active.single_final_price = Set(quote.final_prices.single);
    active.double_final_price = Set(quote.final_prices.double);
    active.triple_final_price = Set(quote.final_prices.triple);
    active.quad_final_price = Set(quote.final_prices.quad);
    active.total_final_price = Set(Some(quote.total_final_price));
    active.quoted_at = Set(Some(Utc::now().into()));
}

pub struct BiddingService<'a> {
    db: &'a DatabaseConnection,
    fallback_margin_percent: f64,
}

impl<'a> BiddingService<'a> {
    /// `fallback_margin_percent` applies when no `default_margin_percent` setting is stored.
    pub fn new(db: &'a DatabaseConnection, fallback_margin_percent: f64) -> Self {
        Self {
            db,
            fallback_margin_percent,
        }
    }

    #[instrument(skip(self, input), fields(provider_id = %actor.id))]
    pub async fn submit_offering(
        &self,
        actor: &CurrentUser,
        request_id: Uuid,
        input: OfferingInput,
    ) -> Result<offering::Model, BiddingError> {
        require_provider(actor)?;

        let txn = self.db.begin().await?;

        let request = RequestRepository::new(&txn)
            .get(request_id)
            .await?
            .ok_or(BiddingError::NotFound("Request"))?;
        if !request.status.is_open() {
            return Err(BiddingError::RequestClosed);
        }

        let offerings = OfferingRepository::new(&txn);
        if offerings
            .find_pending_for_provider(request_id, actor.id)
            .await?
            .is_some()
        {
            return Err(BiddingError::DuplicateOffering);
        }

        let hotel_name = match input.hotel_id {
            Some(hotel_id) => {
                let hotel = HotelRepository::new(&txn)
                    .get(hotel_id)
                    .await?
                    .filter(|hotel| hotel.provider_id == actor.id)
                    .ok_or_else(|| {
                        BiddingError::Validation("Hotel does not belong to this provider".into())
                    })?;
                hotel.name
            }
            None => input
                .hotel_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    BiddingError::Validation("Either hotel_id or hotel_name is required".into())
                })?,
        };

        let total_base_price =
            pricing::stay_cost(&request.room_counts(), &input.prices, request.nights()?)?;

        let now = Utc::now();
        let offering = offerings
            .insert(offering::ActiveModel {
                id: Set(Uuid::new_v4()),
                request_id: Set(request.id),
                provider_id: Set(actor.id),
                hotel_id: Set(input.hotel_id),
                hotel_name: Set(hotel_name),
                single_base_price: Set(input.prices.single),
                double_base_price: Set(input.prices.double),
                triple_base_price: Set(input.prices.triple),
                quad_base_price: Set(input.prices.quad),
                margin_percent: Set(None),
                single_final_price: Set(None),
                double_final_price: Set(None),
                triple_final_price: Set(None),
                quad_final_price: Set(None),
                total_base_price: Set(total_base_price),
                total_final_price: Set(None),
                status: Set(OfferingStatus::Pending),
                notes: Set(normalize_notes(input.notes)),
                quoted_at: Set(None),
                confirmed_at: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            })
            .await?;

        let admin_ids = ProfileRepository::new(&txn).admin_ids().await?;
        let notifications = admin_ids
            .into_iter()
            .map(|admin_id| NewNotification {
                recipient_id: admin_id,
                kind: NotificationKind::OfferingSubmitted,
                title: "New offering received".to_string(),
                message: format!(
                    "{} placed a bid on the {} request ({} to {})",
                    offering.hotel_name, request.city, request.check_in, request.check_out
                ),
                request_id: Some(request.id),
                offering_id: Some(offering.id),
            })
            .collect();
        NotificationRepository::new(&txn)
            .create_many(notifications)
            .await?;

        txn.commit().await?;

        counter!("sakina_offerings_submitted_total").increment(1);
        info!(
            offering_id = %offering.id,
            request_id = %request.id,
            total_base_price = offering.total_base_price,
            "Offering submitted"
        );
        Ok(offering)
    }

    #[instrument(skip(self, update), fields(provider_id = %actor.id))]
    pub async fn update_offering_prices(
        &self,
        actor: &CurrentUser,
        offering_id: Uuid,
        update: OfferingPriceUpdate,
    ) -> Result<offering::Model, BiddingError> {
        require_provider(actor)?;

        let txn = self.db.begin().await?;
        let offerings = OfferingRepository::new(&txn);
        let existing = offerings
            .get(offering_id)
            .await?
            .filter(|o| o.provider_id == actor.id)
            .ok_or(BiddingError::NotFound("Offering"))?;
        ensure_pending(&existing)?;
        if existing.is_quoted() {
            return Err(BiddingError::PricesLocked);
        }

        let request = RequestRepository::new(&txn)
            .get(existing.request_id)
            .await?
            .ok_or(BiddingError::NotFound("Request"))?;
        let total_base_price =
            pricing::stay_cost(&request.room_counts(), &update.prices, request.nights()?)?;

        let mut active = existing.into_active_model();
        active.single_base_price = Set(update.prices.single);
        active.double_base_price = Set(update.prices.double);
        active.triple_base_price = Set(update.prices.triple);
        active.quad_base_price = Set(update.prices.quad);
        active.total_base_price = Set(total_base_price);
        if update.notes.is_some() {
            active.notes = Set(normalize_notes(update.notes));
        }
        active.updated_at = Set(Utc::now().into());

        let Some(offering) = offerings.save_if_unquoted(active).await? else {
            return Err(write_lost(&offerings, offering_id).await);
        };
        txn.commit().await?;

        info!(offering_id = %offering.id, total_base_price, "Offering prices updated");
        Ok(offering)
    }

    /// Quotes a pending offering. The margin defaults to the stored setting.
    #[instrument(skip(self), fields(admin_id = %actor.id))]
    pub async fn apply_margin(
        &self,
        actor: &CurrentUser,
        offering_id: Uuid,
        margin_percent: Option<f64>,
    ) -> Result<QuoteOutcome, BiddingError> {
        require_admin(actor)?;

        let txn = self.db.begin().await?;
        let offerings = OfferingRepository::new(&txn);
        let requests = RequestRepository::new(&txn);

        let existing = offerings
            .get(offering_id)
            .await?
            .ok_or(BiddingError::NotFound("Offering"))?;
        ensure_pending(&existing)?;

        let request = requests
            .get(existing.request_id)
            .await?
            .ok_or(BiddingError::NotFound("Request"))?;
        if !request.status.is_open() {
            return Err(BiddingError::RequestClosed);
        }

        let margin = match margin_percent {
            Some(margin) => margin,
            None => {
                SettingRepository::new(&txn)
                    .default_margin_percent(self.fallback_margin_percent)
                    .await?
            }
        };
        let quote = quote(&request, &existing.base_prices(), margin)?;

        let mut active = existing.into_active_model();
        apply_quote(&mut active, &quote);
        active.updated_at = Set(Utc::now().into());
        let Some(offering) = offerings.save_if_pending(active).await? else {
            return Err(write_lost(&offerings, offering_id).await);
        };

        requests
            .transition_status(request.id, &[RequestStatus::Submitted], RequestStatus::Quoted)
            .await?;
        let request = requests
            .get(request.id)
            .await?
            .ok_or(BiddingError::NotFound("Request"))?;

        NotificationRepository::new(&txn)
            .create(NewNotification {
                recipient_id: request.created_by,
                kind: NotificationKind::RequestQuoted,
                title: "New quote available".to_string(),
                message: format!(
                    "{} quoted your {} request at {}",
                    offering.hotel_name, request.city, quote.total_final_price
                ),
                request_id: Some(request.id),
                offering_id: Some(offering.id),
            })
            .await?;

        txn.commit().await?;

        counter!("sakina_offerings_quoted_total").increment(1);
        info!(
            offering_id = %offering.id,
            margin_percent = margin,
            total_final_price = quote.total_final_price,
            "Margin applied"
        );
        Ok(QuoteOutcome { offering, request })
    }

    /// Confirms the winning offering and cancels its pending siblings atomically.
    #[instrument(skip(self), fields(admin_id = %actor.id))]
    pub async fn confirm_offering(
        &self,
        actor: &CurrentUser,
        offering_id: Uuid,
        margin_percent: Option<f64>,
    ) -> Result<ConfirmOutcome, BiddingError> {
        require_admin(actor)?;

        let txn = self.db.begin().await?;
        let outcome = confirm_in(&txn, offering_id, margin_percent, self.fallback_margin_percent)
            .await?;
        txn.commit().await?;

        counter!("sakina_offerings_confirmed_total").increment(1);
        counter!("sakina_offerings_canceled_total")
            .increment(outcome.canceled_offering_ids.len() as u64);
        info!(
            offering_id = %outcome.offering.id,
            request_id = %outcome.request.id,
            canceled = outcome.canceled_offering_ids.len(),
            "Offering confirmed"
        );
        Ok(outcome)
    }

    /// A provider pulls their own pending bid.
    #[instrument(skip(self), fields(provider_id = %actor.id))]
    pub async fn withdraw_offering(
        &self,
        actor: &CurrentUser,
        offering_id: Uuid,
    ) -> Result<offering::Model, BiddingError> {
        require_provider(actor)?;

        let offerings = OfferingRepository::new(self.db);
        let existing = offerings
            .get(offering_id)
            .await?
            .filter(|o| o.provider_id == actor.id)
            .ok_or(BiddingError::NotFound("Offering"))?;
        ensure_pending(&existing)?;

        let mut active = existing.into_active_model();
        active.status = Set(OfferingStatus::Canceled);
        active.updated_at = Set(Utc::now().into());
        let Some(offering) = offerings.save_if_pending(active).await? else {
            return Err(write_lost(&offerings, offering_id).await);
        };

        counter!("sakina_offerings_canceled_total").increment(1);
        info!(offering_id = %offering.id, "Offering withdrawn");
        Ok(offering)
    }
}

async fn confirm_in<C: ConnectionTrait>(
    txn: &C,
    offering_id: Uuid,
    margin_percent: Option<f64>,
    fallback_margin_percent: f64,
) -> Result<ConfirmOutcome, BiddingError> {
    let offerings = OfferingRepository::new(txn);
    let requests = RequestRepository::new(txn);

    let existing = offerings
        .get(offering_id)
        .await?
        .ok_or(BiddingError::NotFound("Offering"))?;
    ensure_pending(&existing)?;

    let request = requests
        .get(existing.request_id)
        .await?
        .ok_or(BiddingError::NotFound("Request"))?;
    if !request.status.is_open() {
        return Err(BiddingError::RequestClosed);
    }

    // Re-quote when a margin is given or the bid was never quoted.
    let requote = match margin_percent {
        Some(margin) => Some(margin),
        None if !existing.is_quoted() => Some(
            SettingRepository::new(txn)
                .default_margin_percent(fallback_margin_percent)
                .await?,
        ),
        None => None,
    };
    let quote = requote
        .map(|margin| quote(&request, &existing.base_prices(), margin))
        .transpose()?;

    let siblings = offerings.pending_siblings(request.id, existing.id).await?;
    let canceled = offerings
        .cancel_pending_siblings(request.id, existing.id)
        .await?;
    if canceled as usize != siblings.len() {
        tracing::warn!(
            expected = siblings.len(),
            canceled,
            "Sibling cancellation count differs from pending snapshot"
        );
    }

    let now = Utc::now();
    let mut active = existing.into_active_model();
    if let Some(quote) = &quote {
        apply_quote(&mut active, quote);
    }
    active.status = Set(OfferingStatus::Confirmed);
    active.confirmed_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    let Some(offering) = offerings.save_if_pending(active).await? else {
        return Err(write_lost(&offerings, offering_id).await);
    };

    let moved = requests
        .transition_status(
            request.id,
            &[RequestStatus::Submitted, RequestStatus::Quoted],
            RequestStatus::Confirmed,
        )
        .await?;
    if !moved {
        return Err(BiddingError::RequestClosed);
    }
    let request = requests
        .get(request.id)
        .await?
        .ok_or(BiddingError::NotFound("Request"))?;

    let mut notifications = Vec::with_capacity(siblings.len() + 2);
    notifications.push(NewNotification {
        recipient_id: offering.provider_id,
        kind: NotificationKind::OfferingConfirmed,
        title: "Your offering was confirmed".to_string(),
        message: format!(
            "{} won the {} request ({} to {})",
            offering.hotel_name, request.city, request.check_in, request.check_out
        ),
        request_id: Some(request.id),
        offering_id: Some(offering.id),
    });
    notifications.extend(siblings.iter().map(|sibling| NewNotification {
        recipient_id: sibling.provider_id,
        kind: NotificationKind::OfferingCanceled,
        title: "Your offering was not selected".to_string(),
        message: format!(
            "Another offer was confirmed for the {} request ({} to {})",
            request.city, request.check_in, request.check_out
        ),
        request_id: Some(request.id),
        offering_id: Some(sibling.id),
    }));
    notifications.push(NewNotification {
        recipient_id: request.created_by,
        kind: NotificationKind::RequestConfirmed,
        title: "Booking confirmed".to_string(),
        message: format!(
            "{} is confirmed for your {} request",
            offering.hotel_name, request.city
        ),
        request_id: Some(request.id),
        offering_id: Some(offering.id),
    });
    NotificationRepository::new(txn)
        .create_many(notifications)
        .await?;

    Ok(ConfirmOutcome {
        offering,
        canceled_offering_ids: siblings.into_iter().map(|s| s.id).collect(),
        request,
    })
}

/// Explains why a guarded offering write matched no row.
async fn write_lost<C: ConnectionTrait>(
    offerings: &OfferingRepository<'_, C>,
    offering_id: Uuid,
) -> BiddingError {
    match offerings.get(offering_id).await {
        Ok(Some(current)) if current.status != OfferingStatus::Pending => {
            BiddingError::OfferingNotPending(current.status)
        }
        Ok(Some(_)) => BiddingError::PricesLocked,
        Ok(None) => BiddingError::NotFound("Offering"),
        Err(err) => err.into(),
    }
}

fn require_provider(actor: &CurrentUser) -> Result<(), BiddingError> {
    if actor.role != Role::HotelProvider {
        return Err(BiddingError::Forbidden(
            "Only hotel providers can manage offerings".to_string(),
        ));
    }
    Ok(())
}

fn require_admin(actor: &CurrentUser) -> Result<(), BiddingError> {
    if !actor.is_admin() {
        return Err(BiddingError::Forbidden(
            "Only administrators can quote or confirm offerings".to_string(),
        ));
    }
    Ok(())
}

fn ensure_pending(offering: &offering::Model) -> Result<(), BiddingError> {
    if offering.status != OfferingStatus::Pending {
        return Err(BiddingError::OfferingNotPending(offering.status));
    }
    Ok(())
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::PackageType;
    use chrono::NaiveDate;

    fn request_model(single: i32, double: i32, nights: u32) -> request::Model {
        let now = Utc::now();
        request::Model {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            city: "Makkah".to_string(),
            check_in: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 9, 1 + nights).unwrap(),
            single_rooms: single,
            double_rooms: double,
            triple_rooms: 0,
            quad_rooms: 0,
            package_type: PackageType::HalfBoard,
            notes: None,
            status: RequestStatus::Submitted,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn quote_applies_margin_across_stay() {
        let request = request_model(1, 2, 3);
        let base = RoomPrices {
            single: Some(20_000),
            double: Some(30_000),
            triple: None,
            quad: None,
        };

        let quote = quote(&request, &base, 10.0).unwrap();
        assert_eq!(quote.final_prices.single, Some(22_000));
        assert_eq!(quote.final_prices.double, Some(33_000));
        // (22_000 + 2 * 33_000) * 3 nights
        assert_eq!(quote.total_final_price, 264_000);
    }

    #[test]
    fn quote_rejects_bad_margin() {
        let request = request_model(1, 0, 1);
        let base = RoomPrices {
            single: Some(100),
            ..Default::default()
        };
        assert!(matches!(
            quote(&request, &base, -1.0),
            Err(PricingError::InvalidMargin { .. })
        ));
    }

    #[test]
    fn role_guards() {
        let provider = CurrentUser {
            id: Uuid::new_v4(),
            role: Role::HotelProvider,
            workspace_id: None,
        };
        let admin = CurrentUser {
            role: Role::Admin,
            ..provider
        };

        assert!(require_provider(&provider).is_ok());
        assert!(matches!(
            require_provider(&admin),
            Err(BiddingError::Forbidden(_))
        ));
        assert!(require_admin(&admin).is_ok());
        assert!(require_admin(&provider).is_err());
    }

    #[test]
    fn bidding_errors_map_to_http_statuses() {
        use axum::http::StatusCode;

        let cases: Vec<(BiddingError, StatusCode)> = vec![
            (BiddingError::NotFound("Offering"), StatusCode::NOT_FOUND),
            (BiddingError::RequestClosed, StatusCode::CONFLICT),
            (BiddingError::DuplicateOffering, StatusCode::CONFLICT),
            (BiddingError::PricesLocked, StatusCode::CONFLICT),
            (
                BiddingError::OfferingNotPending(OfferingStatus::Canceled),
                StatusCode::CONFLICT,
            ),
            (
                BiddingError::Forbidden("nope".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (
                BiddingError::Pricing(PricingError::InvalidStay),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, status) in cases {
            let api_error: ApiError = error.into();
            assert_eq!(api_error.status, status);
        }
    }
}
