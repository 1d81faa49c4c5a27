//! Migration to create the offerings table.
//!
//! Offerings are hotel provider bids against a request. Prices are stored in
//! minor currency units; final prices stay null until an admin applies a margin.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Offerings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Offerings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Offerings::RequestId).uuid().not_null())
                    .col(ColumnDef::new(Offerings::ProviderId).uuid().not_null())
                    .col(ColumnDef::new(Offerings::HotelId).uuid().null())
                    .col(ColumnDef::new(Offerings::HotelName).text().not_null())
                    .col(ColumnDef::new(Offerings::SingleBasePrice).big_integer().null())
                    .col(ColumnDef::new(Offerings::DoubleBasePrice).big_integer().null())
                    .col(ColumnDef::new(Offerings::TripleBasePrice).big_integer().null())
                    .col(ColumnDef::new(Offerings::QuadBasePrice).big_integer().null())
                    .col(ColumnDef::new(Offerings::MarginPercent).double().null())
                    .col(ColumnDef::new(Offerings::SingleFinalPrice).big_integer().null())
                    .col(ColumnDef::new(Offerings::DoubleFinalPrice).big_integer().null())
                    .col(ColumnDef::new(Offerings::TripleFinalPrice).big_integer().null())
                    .col(ColumnDef::new(Offerings::QuadFinalPrice).big_integer().null())
                    .col(
                        ColumnDef::new(Offerings::TotalBasePrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Offerings::TotalFinalPrice).big_integer().null())
                    .col(
                        ColumnDef::new(Offerings::Status)
                            .text()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Offerings::Notes).text().null())
                    .col(
                        ColumnDef::new(Offerings::QuotedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Offerings::ConfirmedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Offerings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Offerings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offerings_request_id")
                            .from(Offerings::Table, Offerings::RequestId)
                            .to(Requests::Table, Requests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offerings_provider_id")
                            .from(Offerings::Table, Offerings::ProviderId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offerings_hotel_id")
                            .from(Offerings::Table, Offerings::HotelId)
                            .to(Hotels::Table, Hotels::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_offerings_request_status")
                    .table(Offerings::Table)
                    .col(Offerings::RequestId)
                    .col(Offerings::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_offerings_provider_id")
                    .table(Offerings::Table)
                    .col(Offerings::ProviderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_offerings_request_status")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name("idx_offerings_provider_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Offerings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Offerings {
    Table,
    Id,
    RequestId,
    ProviderId,
    HotelId,
    HotelName,
    SingleBasePrice,
    DoubleBasePrice,
    TripleBasePrice,
    QuadBasePrice,
    MarginPercent,
    SingleFinalPrice,
    DoubleFinalPrice,
    TripleFinalPrice,
    QuadFinalPrice,
    TotalBasePrice,
    TotalFinalPrice,
    Status,
    Notes,
    QuotedAt,
    ConfirmedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Requests {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Hotels {
    Table,
    Id,
}
