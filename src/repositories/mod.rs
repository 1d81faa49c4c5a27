//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for the
//! marketplace entities, with tenant-aware listing.
//!
//! Repositories borrow any [`sea_orm::ConnectionTrait`] so the same code runs
//! against the pool or inside a transaction.

use uuid::Uuid;

pub mod commission;
pub mod hotel;
pub mod invoice;
pub mod notification;
pub mod offering;
pub mod profile;
pub mod request;
pub mod setting;
pub mod workspace;

pub use commission::CommissionRepository;
pub use hotel::HotelRepository;
pub use invoice::InvoiceRepository;
pub use notification::NotificationRepository;
pub use offering::OfferingRepository;
pub use profile::ProfileRepository;
pub use request::RequestRepository;
pub use setting::SettingRepository;
pub use workspace::WorkspaceRepository;

/// What rows a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// Admins and super admins see everything.
    Admin,
    /// Travel agents see their own workspace's data.
    Agent { workspace_id: Uuid },
    /// Hotel providers see open requests and their own bids.
    Provider { provider_id: Uuid },
}
