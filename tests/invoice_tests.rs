//! Invoicing of confirmed bookings.

use anyhow::Result;
use axum::http::StatusCode;
use sakina::auth::CurrentUser;
use sakina::bidding::{BiddingService, OfferingInput};
use sakina::cursor::PageRequest;
use sakina::error::RepositoryError;
use sakina::invoicing::InvoiceService;
use sakina::models::invoice::InvoiceStatus;
use sakina::models::offering;
use sakina::models::profile::Role;
use sakina::models::request::RequestStatus;
use sakina::repositories::commission::NewCommission;
use sakina::repositories::{
    AccessScope, CommissionRepository, InvoiceRepository, OfferingRepository, ProfileRepository,
    RequestRepository,
};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{create_request, create_user, create_workspace, prices, setup_test_db};

struct Booking {
    workspace_id: Uuid,
    agent: CurrentUser,
    admin: CurrentUser,
    provider: CurrentUser,
    offering: offering::Model,
}

/// A request with a single bid, quoted at 10% but not yet confirmed.
async fn quoted_booking(db: &DatabaseConnection) -> Result<Booking> {
    let workspace_id = create_workspace(db, "Al Noor Tours").await?;
    let agent = create_user(db, Role::TravelAgent, Some(workspace_id)).await?;
    let provider = create_user(db, Role::HotelProvider, None).await?;
    let admin = create_user(db, Role::Admin, None).await?;
    let request = create_request(db, &agent).await?;

    let service = BiddingService::new(db, 10.0);
    let offering = service
        .submit_offering(
            &provider,
            request.id,
            OfferingInput {
                hotel_id: None,
                hotel_name: Some("Anwar Al Madinah".to_string()),
                prices: prices(40_000, 50_000),
                notes: None,
            },
        )
        .await?;
    let quoted = service.apply_margin(&admin, offering.id, Some(10.0)).await?;

    Ok(Booking {
        workspace_id,
        agent,
        admin,
        provider,
        offering: quoted.offering,
    })
}

#[tokio::test]
async fn unconfirmed_offerings_cannot_be_invoiced() -> Result<()> {
    let db = setup_test_db().await?;
    let booking = quoted_booking(&db).await?;

    let err = InvoiceService::new(&db, "SAR")
        .create_from_offering(booking.offering.id)
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn invoice_applies_active_commission() -> Result<()> {
    let db = setup_test_db().await?;
    let booking = quoted_booking(&db).await?;

    let commissions = CommissionRepository::new(&db);
    commissions
        .create(NewCommission {
            workspace_id: booking.workspace_id,
            rate_percent: 3.0,
            is_active: true,
            notes: None,
        })
        .await?;
    // Activating a second rate retires the first.
    commissions
        .create(NewCommission {
            workspace_id: booking.workspace_id,
            rate_percent: 5.0,
            is_active: true,
            notes: Some("2025 season".to_string()),
        })
        .await?;

    BiddingService::new(&db, 10.0)
        .confirm_offering(&booking.admin, booking.offering.id, None)
        .await?;

    let invoice = InvoiceService::new(&db, "SAR")
        .create_from_offering(booking.offering.id)
        .await
        .unwrap();

    // (44000 + 55000) * 3 nights
    assert_eq!(invoice.amount, 297_000);
    assert_eq!(invoice.commission_amount, 14_850);
    assert_eq!(invoice.currency, "SAR");
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.workspace_id, booking.workspace_id);
    assert!(invoice.invoice_number.starts_with("INV-"));
    Ok(())
}

#[tokio::test]
async fn each_offering_is_invoiced_once() -> Result<()> {
    let db = setup_test_db().await?;
    let booking = quoted_booking(&db).await?;
    BiddingService::new(&db, 10.0)
        .confirm_offering(&booking.admin, booking.offering.id, None)
        .await?;

    let service = InvoiceService::new(&db, "SAR");
    let invoice = service
        .create_from_offering(booking.offering.id)
        .await
        .unwrap();
    assert_eq!(invoice.commission_amount, 0);

    let again = service
        .create_from_offering(booking.offering.id)
        .await
        .unwrap_err();
    assert_eq!(again.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn invoice_status_follows_lifecycle() -> Result<()> {
    let db = setup_test_db().await?;
    let booking = quoted_booking(&db).await?;
    BiddingService::new(&db, 10.0)
        .confirm_offering(&booking.admin, booking.offering.id, None)
        .await?;
    let draft = InvoiceService::new(&db, "SAR")
        .create_from_offering(booking.offering.id)
        .await
        .unwrap();

    let invoices = InvoiceRepository::new(&db);

    let skip = invoices.transition(draft.clone(), InvoiceStatus::Paid).await;
    assert!(matches!(skip, Err(RepositoryError::Conflict(_))));

    let issued = invoices.transition(draft, InvoiceStatus::Issued).await?;
    assert!(issued.issued_at.is_some());

    let paid = invoices.transition(issued, InvoiceStatus::Paid).await?;
    assert!(paid.paid_at.is_some());

    let void = invoices.transition(paid, InvoiceStatus::Void).await;
    assert!(matches!(void, Err(RepositoryError::Conflict(_))));
    Ok(())
}

#[tokio::test]
async fn providers_see_no_invoices() -> Result<()> {
    let db = setup_test_db().await?;
    let booking = quoted_booking(&db).await?;
    BiddingService::new(&db, 10.0)
        .confirm_offering(&booking.admin, booking.offering.id, None)
        .await?;
    InvoiceService::new(&db, "SAR")
        .create_from_offering(booking.offering.id)
        .await
        .unwrap();

    let invoices = InvoiceRepository::new(&db);
    let page = PageRequest::default();

    let provider_view = invoices.list(booking.provider.scope(), None, page).await?;
    assert!(provider_view.items.is_empty());

    let agency_view = invoices
        .list(
            AccessScope::Agent {
                workspace_id: booking.workspace_id,
            },
            None,
            page,
        )
        .await?;
    assert_eq!(agency_view.items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn booked_parties_cannot_be_deleted() -> Result<()> {
    let db = setup_test_db().await?;
    let booking = quoted_booking(&db).await?;
    BiddingService::new(&db, 10.0)
        .confirm_offering(&booking.admin, booking.offering.id, None)
        .await?;
    let invoice = InvoiceService::new(&db, "SAR")
        .create_from_offering(booking.offering.id)
        .await
        .unwrap();

    let profiles = ProfileRepository::new(&db);
    let provider = profiles.delete(booking.provider.id).await;
    assert!(matches!(provider, Err(RepositoryError::Conflict(_))));
    let agent = profiles.delete(booking.agent.id).await;
    assert!(matches!(agent, Err(RepositoryError::Conflict(_))));

    assert!(InvoiceRepository::new(&db).get(invoice.id).await?.is_some());
    let winner = OfferingRepository::new(&db)
        .get(booking.offering.id)
        .await?
        .unwrap();
    assert_eq!(winner.status, offering::OfferingStatus::Confirmed);
    let request = RequestRepository::new(&db)
        .get(winner.request_id)
        .await?
        .unwrap();
    assert_eq!(request.status, RequestStatus::Confirmed);

    // A provider who never bid can still be removed.
    let idle = create_user(&db, Role::HotelProvider, None).await?;
    profiles.delete(idle.id).await?;
    assert!(profiles.get(idle.id).await?.is_none());
    Ok(())
}
