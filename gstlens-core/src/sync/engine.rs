use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use tracing::{error, info, warn};

use crate::error::SyncError;
use crate::events::{AppEvent, EventBus};
use crate::settings::SettingsStore;
use crate::store::{now_ms, InvoiceStore};
use crate::sync::pull::pull_new_invoices;
use crate::sync::push::push_unsynced_invoices;
use crate::sync::remote::InvoiceRemote;
use crate::sync::types::{SyncOutcome, SyncProgress};

/// Whether a sync cycle is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Idle,
    Running,
}

/// Single-flight gate for the whole process.
///
/// The state token is checked-and-set synchronously before the cycle's first
/// suspension point, so two concurrent invocations can never both enter.
/// There is no queueing: the loser of the race skips.
#[derive(Debug)]
struct SyncGate {
    state: Mutex<SyncState>,
}

impl SyncGate {
    fn new() -> Self {
        SyncGate {
            state: Mutex::new(SyncState::Idle),
        }
    }

    /// Attempts to enter the running state. Returns a guard that restores
    /// `Idle` on drop - every exit path, including errors, releases the gate.
    fn try_begin(&self) -> Option<SyncGuard<'_>> {
        let mut state = self.state.lock().expect("sync gate poisoned");
        if *state == SyncState::Running {
            return None;
        }
        *state = SyncState::Running;
        Some(SyncGuard { gate: self })
    }

    fn is_running(&self) -> bool {
        *self.state.lock().expect("sync gate poisoned") == SyncState::Running
    }
}

struct SyncGuard<'a> {
    gate: &'a SyncGate,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        *self.gate.state.lock().expect("sync gate poisoned") = SyncState::Idle;
    }
}

/// Human-facing sync state for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// A cycle is running right now.
    Syncing,
    /// No cycle has ever completed on this device.
    NeverSynced,
    /// Last successful cycle finished at this epoch-ms instant.
    LastSyncedAt(i64),
}

/// Orchestrates bidirectional cloud synchronization.
///
/// Each cycle runs push then pull, strictly sequential: uploading first
/// keeps the remote from handing back records the device is about to change
/// anyway, and the remote echoes our stable local ids so freshly pushed
/// records merge onto themselves if the window overlaps. The checkpoint
/// advances only after a fully successful cycle, so a failed cycle retries
/// the same window in full - at-least-once, made safe by idempotent upserts.
pub struct SyncEngine {
    store: InvoiceStore,
    settings: SettingsStore,
    remote: Arc<dyn InvoiceRemote>,
    events: EventBus,
    gate: SyncGate,
}

impl SyncEngine {
    pub fn new(
        store: InvoiceStore,
        settings: SettingsStore,
        remote: Arc<dyn InvoiceRemote>,
        events: EventBus,
    ) -> Self {
        SyncEngine {
            store,
            settings,
            remote,
            events,
            gate: SyncGate::new(),
        }
    }

    /// Runs one full sync cycle, discarding progress reports.
    ///
    /// Fire-and-forget friendly: UI listens for the sync-completed event
    /// rather than awaiting this. Returns `SyncOutcome::Skipped` without
    /// touching the network when a cycle is already in flight.
    pub async fn perform_cloud_sync(&self) -> Result<SyncOutcome, SyncError> {
        self.sync_with_progress(|_| {}).await
    }

    /// Runs one full sync cycle, reporting per-record progress.
    ///
    /// # Errors
    ///
    /// Propagates the classified [`SyncError`]; the checkpoint is left
    /// untouched on any failure.
    pub async fn sync_with_progress(
        &self,
        mut on_progress: impl FnMut(SyncProgress) + Send,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = self.gate.try_begin() else {
            info!("Sync already in progress - skipping");
            return Ok(SyncOutcome::Skipped);
        };

        match self.run_cycle(&mut on_progress).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_entitlement() => {
                warn!("Cloud sync requires an active subscription");
                Err(e)
            }
            Err(e) => {
                error!("Cloud sync failed: {} - will retry later", e);
                Err(e)
            }
        }
    }

    async fn run_cycle(
        &self,
        on_progress: &mut (dyn FnMut(SyncProgress) + Send),
    ) -> Result<SyncOutcome, SyncError> {
        let last_sync_time = self.settings.last_sync_time().await?;
        if last_sync_time == 0 {
            info!("First time sync - pulling full history");
        }

        let pushed = push_unsynced_invoices(&self.store, self.remote.as_ref(), on_progress).await?;
        let pulled =
            pull_new_invoices(&self.store, self.remote.as_ref(), last_sync_time, on_progress)
                .await?;

        self.settings.set_last_sync_time(now_ms()).await?;
        self.events.publish(AppEvent::SyncCompleted);

        info!("Cloud sync completed: {} pushed, {} pulled", pushed, pulled);

        Ok(SyncOutcome::Completed { pushed, pulled })
    }

    /// Current sync state for status displays.
    pub async fn status(&self) -> Result<SyncStatus, SyncError> {
        if self.gate.is_running() {
            return Ok(SyncStatus::Syncing);
        }

        let last_sync_time = self.settings.last_sync_time().await?;
        if last_sync_time == 0 {
            return Ok(SyncStatus::NeverSynced);
        }

        Ok(SyncStatus::LastSyncedAt(last_sync_time))
    }
}

/// Renders a checkpoint as a short status line: today shows the time,
/// yesterday says so, anything older shows the date.
pub fn format_last_sync(last_sync_ms: i64, now: DateTime<Utc>) -> String {
    let synced = match Utc.timestamp_millis_opt(last_sync_ms).single() {
        Some(dt) => dt,
        None => return "Not synced".to_string(),
    };

    let same_day = |a: DateTime<Utc>, b: DateTime<Utc>| {
        a.year() == b.year() && a.month() == b.month() && a.day() == b.day()
    };

    if same_day(synced, now) {
        return format!("Last synced: {}", synced.format("%H:%M"));
    }

    if same_day(synced, now - Duration::days(1)) {
        return "Last synced: Yesterday".to_string();
    }

    format!("Last synced: {}", synced.format("%d %b %Y"))
}
