//! # Setting Repository
//!
//! Key/value JSON settings with typed accessors for the keys the
//! marketplace reads.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryOrder, Set};
use serde_json::Value;

use crate::error::RepositoryError;
use crate::models::setting::{self, CURRENCY, DEFAULT_MARGIN_PERCENT, Entity as Setting};
use crate::pricing;

pub struct SettingRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> SettingRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> Result<Option<setting::Model>, RepositoryError> {
        Setting::find_by_id(key.to_string())
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(&self) -> Result<Vec<setting::Model>, RepositoryError> {
        Setting::find()
            .order_by_asc(setting::Column::Key)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Inserts or replaces a setting. Known keys are type-checked.
    pub async fn upsert(
        &self,
        key: &str,
        value: Value,
        description: Option<String>,
    ) -> Result<setting::Model, RepositoryError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(RepositoryError::validation_error("Setting key cannot be empty"));
        }
        validate_known_setting(key, &value)?;
        let now = Utc::now();

        match self.get(key).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.value = Set(value);
                if description.is_some() {
                    active.description = Set(description);
                }
                active.updated_at = Set(now.into());
                active
                    .update(self.db)
                    .await
                    .map_err(RepositoryError::database_error)
            }
            None => setting::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value),
                description: Set(description),
                updated_at: Set(now.into()),
            }
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error),
        }
    }

    /// Margin used when an admin quotes without an explicit margin.
    pub async fn default_margin_percent(&self, fallback: f64) -> Result<f64, RepositoryError> {
        let stored = self
            .get(DEFAULT_MARGIN_PERCENT)
            .await?
            .and_then(|s| s.value.as_f64());

        match stored {
            Some(margin) if pricing::validate_margin(margin).is_ok() => Ok(margin),
            Some(margin) => {
                tracing::warn!(margin, "Stored default margin is out of range, using fallback");
                Ok(fallback)
            }
            None => Ok(fallback),
        }
    }

    pub async fn currency(&self, fallback: &str) -> Result<String, RepositoryError> {
        Ok(self
            .get(CURRENCY)
            .await?
            .and_then(|s| s.value.as_str().map(str::to_string))
            .unwrap_or_else(|| fallback.to_string()))
    }
}

fn validate_known_setting(key: &str, value: &Value) -> Result<(), RepositoryError> {
    match key {
        DEFAULT_MARGIN_PERCENT => {
            let margin = value.as_f64().ok_or_else(|| {
                RepositoryError::validation_error("default_margin_percent must be a number")
            })?;
            pricing::validate_margin(margin)
                .map_err(|e| RepositoryError::validation_error(e.to_string()))
        }
        CURRENCY => match value.as_str() {
            Some(code) if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) => Ok(()),
            _ => Err(RepositoryError::validation_error(
                "currency must be a three-letter uppercase code",
            )),
        },
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_settings_are_type_checked() {
        assert!(validate_known_setting(DEFAULT_MARGIN_PERCENT, &json!(12.5)).is_ok());
        assert!(validate_known_setting(DEFAULT_MARGIN_PERCENT, &json!("12")).is_err());
        assert!(validate_known_setting(DEFAULT_MARGIN_PERCENT, &json!(-1)).is_err());
        assert!(validate_known_setting(CURRENCY, &json!("SAR")).is_ok());
        assert!(validate_known_setting(CURRENCY, &json!("sar")).is_err());
        assert!(validate_known_setting("banner_text", &json!({"en": "Welcome"})).is_ok());
    }
}
