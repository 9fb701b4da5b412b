use tracing::info;

use crate::error::{RemoteError, SyncError};
use crate::store::InvoiceStore;
use crate::sync::remote::InvoiceRemote;
use crate::sync::types::{PushRecord, SyncPhase, SyncProgress};

/// Uploads local changes to the cloud (the push half of a sync cycle).
///
/// Reads every unsynced record, drops drafts (provisional, pending user
/// review), submits the rest as one batch, and writes through the returned
/// cloud ids record by record. The progress callback fires once per record
/// after its local mark-synced completes.
///
/// Any remote failure aborts the phase and propagates: records are only
/// treated as synced once the full acknowledgement was received, so a torn
/// response is retried in full next cycle.
///
/// # Arguments
///
/// * `store` - Local invoice store
/// * `remote` - Remote sync authority
/// * `on_progress` - Per-record progress callback
///
/// # Returns
///
/// Returns the number of records pushed (0 when there was nothing to do).
pub async fn push_unsynced_invoices(
    store: &InvoiceStore,
    remote: &dyn InvoiceRemote,
    on_progress: &mut (dyn FnMut(SyncProgress) + Send),
) -> Result<usize, SyncError> {
    let unsynced: Vec<_> = store
        .list_unsynced()
        .await?
        .into_iter()
        .filter(|inv| inv.status.is_sync_eligible())
        .collect();

    info!("Unsynced invoices: {}", unsynced.len());
    if unsynced.is_empty() {
        return Ok(0);
    }

    let batch: Vec<PushRecord> = unsynced.iter().map(PushRecord::from).collect();

    let cloud_ids = remote.push_invoices(&batch).await?;

    // The acknowledgement must cover the batch one-for-one before any
    // record is marked synced; a short response would otherwise silently
    // strand the tail as pushed-but-unacknowledged.
    if cloud_ids.len() != batch.len() {
        return Err(SyncError::Remote(RemoteError::Protocol(format!(
            "pushed {} records but received {} cloud ids",
            batch.len(),
            cloud_ids.len()
        ))));
    }

    let total = unsynced.len();
    for (i, (invoice, cloud_id)) in unsynced.iter().zip(cloud_ids.iter()).enumerate() {
        store.mark_as_synced(&invoice.id, cloud_id).await?;
        on_progress(SyncProgress {
            phase: SyncPhase::Push,
            current: i + 1,
            total,
        });
    }

    Ok(total)
}
