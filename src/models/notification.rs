//! Notification entity model
//!
//! Feed entries addressed to a single profile.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[sea_orm(string_value = "request_submitted")]
    RequestSubmitted,
    #[sea_orm(string_value = "offering_submitted")]
    OfferingSubmitted,
    #[sea_orm(string_value = "request_quoted")]
    RequestQuoted,
    #[sea_orm(string_value = "offering_confirmed")]
    OfferingConfirmed,
    #[sea_orm(string_value = "offering_canceled")]
    OfferingCanceled,
    #[sea_orm(string_value = "request_confirmed")]
    RequestConfirmed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub recipient_id: Uuid,

    pub kind: NotificationKind,

    pub title: String,

    pub message: String,

    pub request_id: Option<Uuid>,

    pub offering_id: Option<Uuid>,

    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
