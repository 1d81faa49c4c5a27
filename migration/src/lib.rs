//! Database migrations for the SAKINA marketplace.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_10_000001_create_workspaces;
mod m2025_01_10_000002_create_profiles;
mod m2025_01_10_000003_create_hotels;
mod m2025_01_10_000004_create_requests;
mod m2025_01_10_000005_create_offerings;
mod m2025_01_10_000006_create_commissions;
mod m2025_01_10_000007_create_settings;
mod m2025_01_10_000008_create_notifications;
mod m2025_01_10_000009_create_invoices;
mod m2025_01_12_000100_add_offering_confirmed_guard;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_10_000001_create_workspaces::Migration),
            Box::new(m2025_01_10_000002_create_profiles::Migration),
            Box::new(m2025_01_10_000003_create_hotels::Migration),
            Box::new(m2025_01_10_000004_create_requests::Migration),
            Box::new(m2025_01_10_000005_create_offerings::Migration),
            Box::new(m2025_01_10_000006_create_commissions::Migration),
            Box::new(m2025_01_10_000007_create_settings::Migration),
            Box::new(m2025_01_10_000008_create_notifications::Migration),
            Box::new(m2025_01_10_000009_create_invoices::Migration),
            Box::new(m2025_01_12_000100_add_offering_confirmed_guard::Migration),
        ]
    }
}
