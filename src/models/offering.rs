//! Offering entity model
//!
//! An offering is a hotel provider's priced bid against a request. Base prices
//! come from the provider; final prices are derived once an admin applies a
//! margin. All amounts are integer minor currency units.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::pricing::RoomPrices;

/// Offering lifecycle: PENDING → CONFIRMED | CANCELED
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferingStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "CANCELED")]
    Canceled,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "offerings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub request_id: Uuid,

    /// Hotel provider profile that placed the bid
    pub provider_id: Uuid,

    pub hotel_id: Option<Uuid>,

    pub hotel_name: String,

    pub single_base_price: Option<i64>,
    pub double_base_price: Option<i64>,
    pub triple_base_price: Option<i64>,
    pub quad_base_price: Option<i64>,

    /// Admin-applied margin percentage; null until quoted
    pub margin_percent: Option<f64>,

    pub single_final_price: Option<i64>,
    pub double_final_price: Option<i64>,
    pub triple_final_price: Option<i64>,
    pub quad_final_price: Option<i64>,

    /// Whole-stay cost at base prices
    pub total_base_price: i64,

    /// Whole-stay cost at final prices; null until quoted
    pub total_final_price: Option<i64>,

    pub status: OfferingStatus,

    pub notes: Option<String>,

    pub quoted_at: Option<DateTimeWithTimeZone>,

    pub confirmed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn base_prices(&self) -> RoomPrices {
        RoomPrices {
            single: self.single_base_price,
            double: self.double_base_price,
            triple: self.triple_base_price,
            quad: self.quad_base_price,
        }
    }

    pub fn final_prices(&self) -> RoomPrices {
        RoomPrices {
            single: self.single_final_price,
            double: self.double_final_price,
            triple: self.triple_final_price,
            quad: self.quad_final_price,
        }
    }

    /// A margin has been applied and final prices are available.
    pub fn is_quoted(&self) -> bool {
        self.margin_percent.is_some() && self.total_final_price.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::request::Entity",
        from = "Column::RequestId",
        to = "super::request::Column::Id"
    )]
    Request,
}

impl Related<super::request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
