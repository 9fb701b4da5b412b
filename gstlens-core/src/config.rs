use std::env;

use crate::sync::scheduler::DEFAULT_SYNC_INTERVAL_MS;

/// Runtime configuration, gathered from the environment.
///
/// Every field has a sensible default so a bare `.env` is enough to run
/// offline; cloud sync additionally needs `GSTLENS_API_BASE` and, for
/// authenticated deployments, `GSTLENS_API_TOKEN`.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Path of the local SQLite database file.
    pub db_path: String,
    /// Base URL of the sync API.
    pub api_base: String,
    /// Bearer token attached to sync requests, when present.
    pub api_token: Option<String>,
    /// Background sync interval in milliseconds.
    pub sync_interval_ms: u64,
    /// Whether background cloud sync should run at all.
    pub cloud_sync_enabled: bool,
}

impl SyncConfig {
    /// Reads configuration from the environment (after `dotenv`).
    pub fn from_env() -> Self {
        SyncConfig {
            db_path: env::var("GSTLENS_DB_PATH").unwrap_or_else(|_| "gstlens.db".to_string()),
            api_base: env::var("GSTLENS_API_BASE")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            api_token: env::var("GSTLENS_API_TOKEN").ok(),
            sync_interval_ms: env::var("SYNC_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SYNC_INTERVAL_MS),
            cloud_sync_enabled: env::var("CLOUD_SYNC_ENABLED")
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}
