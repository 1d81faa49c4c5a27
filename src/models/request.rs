//! Request entity model
//!
//! A request is a travel agency's accommodation need. Hotel providers bid on
//! open requests with offerings.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::pricing::{self, PricingError, RoomCounts};

/// Request lifecycle: Submitted → Quoted → Confirmed
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum RequestStatus {
    #[sea_orm(string_value = "Submitted")]
    Submitted,
    #[sea_orm(string_value = "Quoted")]
    Quoted,
    #[sea_orm(string_value = "Confirmed")]
    Confirmed,
}

impl RequestStatus {
    /// Requests accept new bids until an offering is confirmed.
    pub fn is_open(self) -> bool {
        !matches!(self, RequestStatus::Confirmed)
    }
}

/// Board basis requested by the agency
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    #[sea_orm(string_value = "room_only")]
    RoomOnly,
    #[sea_orm(string_value = "bed_breakfast")]
    BedBreakfast,
    #[sea_orm(string_value = "half_board")]
    HalfBoard,
    #[sea_orm(string_value = "full_board")]
    FullBoard,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning travel agency
    pub workspace_id: Uuid,

    /// Travel agent profile that submitted the request
    pub created_by: Uuid,

    pub city: String,

    pub check_in: Date,

    pub check_out: Date,

    pub single_rooms: i32,
    pub double_rooms: i32,
    pub triple_rooms: i32,
    pub quad_rooms: i32,

    pub package_type: PackageType,

    pub notes: Option<String>,

    pub status: RequestStatus,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn room_counts(&self) -> RoomCounts {
        RoomCounts {
            single: self.single_rooms,
            double: self.double_rooms,
            triple: self.triple_rooms,
            quad: self.quad_rooms,
        }
    }

    /// Length of stay in nights
    pub fn nights(&self) -> Result<i64, PricingError> {
        pricing::nights(self.check_in, self.check_out)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::workspace::Entity",
        from = "Column::WorkspaceId",
        to = "super::workspace::Column::Id"
    )]
    Workspace,
    #[sea_orm(has_many = "super::offering::Entity")]
    Offering,
}

impl Related<super::workspace::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workspace.def()
    }
}

impl Related<super::offering::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offering.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
