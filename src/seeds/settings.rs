//! Default settings seeding
//!
//! Ensures `default_margin_percent` and `currency` exist, taking their initial
//! values from configuration. Existing rows are never overwritten so admin
//! edits survive restarts.

use anyhow::Result;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};

use crate::config::AppConfig;
use crate::models::setting::{CURRENCY, DEFAULT_MARGIN_PERCENT};
use crate::repositories::SettingRepository;

struct SettingSeed {
    key: &'static str,
    value: Value,
    description: &'static str,
}

/// Seeds missing default settings. Returns how many rows were created.
pub async fn seed_settings(db: &DatabaseConnection, config: &AppConfig) -> Result<usize> {
    let repo = SettingRepository::new(db);

    let seeds = [
        SettingSeed {
            key: DEFAULT_MARGIN_PERCENT,
            value: json!(config.default_margin_percent),
            description: "Margin applied when an admin quotes without an explicit margin",
        },
        SettingSeed {
            key: CURRENCY,
            value: json!(config.currency),
            description: "ISO 4217 code for all monetary amounts",
        },
    ];

    let mut created = 0;
    for seed in seeds {
        if repo.get(seed.key).await?.is_some() {
            log::info!("Setting '{}' already exists, skipping", seed.key);
            continue;
        }

        log::info!("Creating setting: {}", seed.key);
        if let Err(e) = repo
            .upsert(seed.key, seed.value, Some(seed.description.to_string()))
            .await
        {
            log::error!("Failed to create setting '{}': {}", seed.key, e);
            return Err(e.into());
        }
        created += 1;
    }

    log::info!("Settings seeding completed ({} created)", created);
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    #[tokio::test]
    async fn seeds_once_and_keeps_admin_edits() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let config = AppConfig::default();

        assert_eq!(seed_settings(&db, &config).await.unwrap(), 2);

        let repo = SettingRepository::new(&db);
        repo.upsert(DEFAULT_MARGIN_PERCENT, json!(7.5), None)
            .await
            .unwrap();

        assert_eq!(seed_settings(&db, &config).await.unwrap(), 0);
        assert_eq!(repo.default_margin_percent(10.0).await.unwrap(), 7.5);
        assert_eq!(repo.currency("USD").await.unwrap(), "SAR");
    }
}
