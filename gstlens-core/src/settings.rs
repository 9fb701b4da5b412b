use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::error::StoreError;

const LAST_SYNC_TIME_KEY: &str = "last_sync_time";
const APP_SETTINGS_KEY: &str = "app_settings";

/// Device-local application preferences.
///
/// These never leave the device; the sync checkpoint lives alongside them in
/// the same key-value area but is managed separately by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub auto_save: bool,
    pub notifications_enabled: bool,
    pub cloud_sync_enabled: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            auto_save: false,
            notifications_enabled: true,
            cloud_sync_enabled: false,
        }
    }
}

/// Local key-value settings area backed by the `local_settings` table.
///
/// Holds the sync checkpoint (`last_sync_time`) and device-local app
/// preferences. Missing keys fall back to defaults, so a fresh database
/// behaves like a never-synced install.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    pool: SqlitePool,
}

impl SettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsStore { pool }
    }

    /// Reads the sync checkpoint (epoch ms). Returns 0 when the device has
    /// never completed a sync cycle.
    pub async fn last_sync_time(&self) -> Result<i64, StoreError> {
        let value = self.get_value(LAST_SYNC_TIME_KEY).await?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    /// Advances the sync checkpoint. Called only after a sync cycle has
    /// completed successfully in full.
    pub async fn set_last_sync_time(&self, epoch_ms: i64) -> Result<(), StoreError> {
        self.set_value(LAST_SYNC_TIME_KEY, &epoch_ms.to_string()).await
    }

    /// Reads the app preferences, applying defaults for anything unset.
    pub async fn app_settings(&self) -> Result<AppSettings, StoreError> {
        let value = self.get_value(APP_SETTINGS_KEY).await?;
        match value {
            Some(json) => Ok(serde_json::from_str(&json).unwrap_or_default()),
            None => Ok(AppSettings::default()),
        }
    }

    /// Persists the app preferences as one JSON value.
    pub async fn save_app_settings(&self, settings: &AppSettings) -> Result<(), StoreError> {
        let json = serde_json::to_string(settings)?;
        self.set_value(APP_SETTINGS_KEY, &json).await
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM local_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get("value")?),
            None => None,
        })
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO local_settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    #[tokio::test]
    async fn checkpoint_defaults_to_zero_and_round_trips() {
        let pool = create_memory_pool().await.expect("memory pool");
        let settings = SettingsStore::new(pool);

        assert_eq!(settings.last_sync_time().await.unwrap(), 0);

        settings.set_last_sync_time(1_700_000_000_000).await.unwrap();
        assert_eq!(settings.last_sync_time().await.unwrap(), 1_700_000_000_000);
    }

    #[tokio::test]
    async fn app_settings_default_and_persist() {
        let pool = create_memory_pool().await.expect("memory pool");
        let settings = SettingsStore::new(pool);

        let defaults = settings.app_settings().await.unwrap();
        assert!(!defaults.auto_save);
        assert!(defaults.notifications_enabled);
        assert!(!defaults.cloud_sync_enabled);

        let updated = AppSettings {
            cloud_sync_enabled: true,
            ..defaults
        };
        settings.save_app_settings(&updated).await.unwrap();
        assert_eq!(settings.app_settings().await.unwrap(), updated);
    }
}
