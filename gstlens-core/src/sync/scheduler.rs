use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::sync::engine::SyncEngine;

/// Default background sync interval (2 minutes).
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 120_000;

/// Periodic driver for the sync engine.
///
/// Fires an immediate sync on start, then repeats every interval. Ticks that
/// land while a cycle is still running are absorbed by the engine's
/// single-flight gate, so overlap is a skip rather than a race; manual syncs
/// triggered elsewhere (e.g. right after an upload) share the same gate.
pub struct BackgroundSync {
    engine: Arc<SyncEngine>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundSync {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        BackgroundSync {
            engine,
            handle: Mutex::new(None),
        }
    }

    /// Starts the periodic timer.
    ///
    /// Always stops any prior timer first, so restarting is idempotent. When
    /// `enabled` is false (no active subscription, or cloud sync switched
    /// off) no timer is created at all.
    pub fn start(&self, enabled: bool, interval: Duration) {
        self.stop();

        if !enabled {
            info!("Cloud sync disabled - background sync not started");
            return;
        }

        info!("Starting background sync every {:?}", interval);

        let engine = Arc::clone(&self.engine);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                // First tick completes immediately: sync on start.
                ticker.tick().await;
                if let Err(e) = engine.perform_cloud_sync().await {
                    // Already classified and logged by the engine; keep the
                    // loop alive so transient failures retry next tick.
                    warn!("Background sync cycle failed: {}", e);
                }
            }
        });

        *self.handle.lock().expect("background sync handle poisoned") = Some(task);
    }

    /// Cancels the timer. Safe to call when not started.
    pub fn stop(&self) {
        let mut handle = self.handle.lock().expect("background sync handle poisoned");
        if let Some(task) = handle.take() {
            task.abort();
            info!("Background sync stopped");
        }
    }
}

impl Drop for BackgroundSync {
    fn drop(&mut self) {
        self.stop();
    }
}
