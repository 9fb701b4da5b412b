use tracing::{debug, info};

use crate::error::SyncError;
use crate::store::InvoiceStore;
use crate::sync::remote::InvoiceRemote;
use crate::sync::types::{SyncPhase, SyncProgress};

/// Downloads remote changes since the checkpoint (the pull half of a sync
/// cycle).
///
/// Requests every remote record updated after `last_sync_time_ms` and merges
/// them into the store. The one conflict rule is local-delete-wins: a
/// locally tombstoned record is never overwritten by a stale remote edit;
/// only a remote deletion may touch it. Everything else is applied as-is
/// (remote wins), marked synced, with a fresh local id minted for invoices
/// first seen from the cloud.
///
/// # Arguments
///
/// * `store` - Local invoice store
/// * `remote` - Remote sync authority
/// * `last_sync_time_ms` - Checkpoint for the incremental window (epoch ms)
/// * `on_progress` - Per-record progress callback
///
/// # Returns
///
/// Returns the number of remote records processed.
pub async fn pull_new_invoices(
    store: &InvoiceStore,
    remote: &dyn InvoiceRemote,
    last_sync_time_ms: i64,
    on_progress: &mut (dyn FnMut(SyncProgress) + Send),
) -> Result<usize, SyncError> {
    let invoices = remote.pull_invoices(last_sync_time_ms).await?;

    info!("Remote invoices in window: {}", invoices.len());
    if invoices.is_empty() {
        return Ok(0);
    }

    let total = invoices.len();
    for (i, cloud_inv) in invoices.into_iter().enumerate() {
        let local = match &cloud_inv.local_id {
            Some(local_id) => store.get_by_id(local_id).await?,
            None => None,
        };

        // Local delete wins over a stale remote update.
        if local.as_ref().is_some_and(|inv| inv.deleted) && !cloud_inv.deleted {
            debug!(
                "Skipping remote update for locally deleted invoice {:?}",
                cloud_inv.local_id
            );
            on_progress(SyncProgress {
                phase: SyncPhase::Pull,
                current: i + 1,
                total,
            });
            continue;
        }

        store.upsert(&cloud_inv.into_record()).await?;

        on_progress(SyncProgress {
            phase: SyncPhase::Pull,
            current: i + 1,
            total,
        });
    }

    Ok(total)
}
