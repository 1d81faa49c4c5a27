//! Migration to create the requests table.
//!
//! A request is a travel agency's accommodation need, scoped to its workspace.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Requests::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Requests::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Requests::WorkspaceId).uuid().not_null())
                    .col(ColumnDef::new(Requests::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Requests::City).text().not_null())
                    .col(ColumnDef::new(Requests::CheckIn).date().not_null())
                    .col(ColumnDef::new(Requests::CheckOut).date().not_null())
                    .col(
                        ColumnDef::new(Requests::SingleRooms)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Requests::DoubleRooms)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Requests::TripleRooms)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Requests::QuadRooms)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Requests::PackageType).text().not_null())
                    .col(ColumnDef::new(Requests::Notes).text().null())
                    .col(
                        ColumnDef::new(Requests::Status)
                            .text()
                            .not_null()
                            .default("Submitted"),
                    )
                    .col(
                        ColumnDef::new(Requests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Requests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requests_workspace_id")
                            .from(Requests::Table, Requests::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requests_created_by")
                            .from(Requests::Table, Requests::CreatedBy)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Tenant-scoped listing
        manager
            .create_index(
                Index::create()
                    .name("idx_requests_workspace_status")
                    .table(Requests::Table)
                    .col(Requests::WorkspaceId)
                    .col(Requests::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_requests_workspace_status")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Requests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Requests {
    Table,
    Id,
    WorkspaceId,
    CreatedBy,
    City,
    CheckIn,
    CheckOut,
    SingleRooms,
    DoubleRooms,
    TripleRooms,
    QuadRooms,
    PackageType,
    Notes,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Workspaces {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}
