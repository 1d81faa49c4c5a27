//! Test utilities for database testing.
//!
//! Sets up in-memory SQLite databases with migrations applied and provides
//! fixtures for the marketplace actors.

#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use sakina::auth::CurrentUser;
use sakina::models::profile::Role;
use sakina::models::request::{self, PackageType};
use sakina::pricing::{RoomCounts, RoomPrices};
use sakina::repositories::profile::NewProfile;
use sakina::repositories::request::NewRequest;
use sakina::repositories::{ProfileRepository, RequestRepository, WorkspaceRepository};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn create_workspace(db: &DatabaseConnection, name: &str) -> Result<Uuid> {
    let workspace = WorkspaceRepository::new(db).create(name.to_string()).await?;
    Ok(workspace.id)
}

/// Creates a profile and returns it as an authenticated caller.
pub async fn create_user(
    db: &DatabaseConnection,
    role: Role,
    workspace_id: Option<Uuid>,
) -> Result<CurrentUser> {
    let profile = ProfileRepository::new(db)
        .create(NewProfile {
            id: None,
            email: format!("{}@sakina.test", Uuid::new_v4().simple()),
            full_name: None,
            role,
            workspace_id,
        })
        .await?;

    Ok(CurrentUser {
        id: profile.id,
        role: profile.role,
        workspace_id: profile.workspace_id,
    })
}

/// Three nights in Madinah for one double and one triple room.
pub async fn create_request(
    db: &DatabaseConnection,
    agent: &CurrentUser,
) -> Result<request::Model> {
    let workspace_id = agent
        .workspace_id
        .ok_or_else(|| anyhow::anyhow!("agent has no workspace"))?;

    let request = RequestRepository::new(db)
        .create(
            workspace_id,
            agent.id,
            NewRequest {
                city: "Madinah".to_string(),
                check_in: date(2025, 9, 10),
                check_out: date(2025, 9, 13),
                rooms: RoomCounts {
                    single: 0,
                    double: 1,
                    triple: 1,
                    quad: 0,
                },
                package_type: PackageType::BedBreakfast,
                notes: None,
            },
        )
        .await?;

    Ok(request)
}

pub fn prices(double: i64, triple: i64) -> RoomPrices {
    RoomPrices {
        single: None,
        double: Some(double),
        triple: Some(triple),
        quad: None,
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}
