//! # Data Models
//!
//! SeaORM entities for the marketplace and small shared response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod commission;
pub mod hotel;
pub mod invoice;
pub mod notification;
pub mod offering;
pub mod profile;
pub mod request;
pub mod setting;
pub mod workspace;

pub use commission::Entity as Commission;
pub use hotel::Entity as Hotel;
pub use invoice::Entity as Invoice;
pub use notification::Entity as Notification;
pub use offering::Entity as Offering;
pub use profile::Entity as Profile;
pub use request::Entity as Request;
pub use setting::Entity as Setting;
pub use workspace::Entity as Workspace;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "sakina".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
