//! # SAKINA API Main Entry Point
//!
//! Sub-commands:
//! - `serve`: run migrations, seed defaults and start the API server.
//! - `migrate`: apply pending database migrations.
//! - `seed`: insert default settings.
//! - `issue-token`: mint a bearer token for an existing profile.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sakina::{
    auth::issue_token,
    config::ConfigLoader,
    db,
    migration::{Migrator, MigratorTrait},
    repositories::ProfileRepository,
    seeds, server, telemetry,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "sakina", about = "SAKINA hotel-bidding marketplace API", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server (default).
    Serve,
    /// Run pending database migrations.
    Migrate,
    /// Seed default settings.
    Seed,
    /// Issue a bearer token for a profile, by id or email.
    IssueToken {
        /// Profile id or email address
        profile: String,
        /// Token lifetime in hours
        #[arg(long, default_value_t = 24)]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing telemetry")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            Migrator::up(&db, None).await.context("applying migrations")?;
            seeds::seed_settings(&db, &config).await?;

            let shutdown = CancellationToken::new();
            tokio::spawn(server::shutdown_signal(shutdown.clone()));
            server::run_server(Arc::new(config), db, shutdown).await?;
        }
        Command::Migrate => {
            Migrator::up(&db, None).await.context("applying migrations")?;
            tracing::info!("Migrations applied successfully");
        }
        Command::Seed => {
            let created = seeds::seed_settings(&db, &config).await?;
            tracing::info!(created, "Seeding finished");
        }
        Command::IssueToken { profile, ttl_hours } => {
            if ttl_hours <= 0 {
                bail!("--ttl-hours must be positive");
            }
            let repo = ProfileRepository::new(&db);
            let found = match Uuid::parse_str(&profile) {
                Ok(id) => repo.get(id).await?,
                Err(_) => repo.find_by_email(&profile).await?,
            };
            let Some(found) = found else {
                bail!("no profile matches '{}'", profile);
            };

            let token = issue_token(
                &config.jwt_secret,
                found.id,
                chrono::Duration::hours(ttl_hours),
            )
            .context("signing token")?;
            println!("{}", token);
        }
    }

    Ok(())
}
