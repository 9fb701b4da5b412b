use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{InvoiceRecord, InvoiceStatus};

/// One invoice as submitted to the push endpoint.
///
/// Timestamps are truncated to epoch seconds on the wire; the store keeps
/// milliseconds locally.
#[derive(Debug, Clone, Serialize)]
pub struct PushRecord {
    /// Stable local id, echoed back by the remote on future pulls.
    pub local_id: String,

    /// Remote id from a previous push, or `None` for a first upload.
    pub cloud_id: Option<String>,

    /// Tombstone flag; deletions are pushed like any other change.
    pub deleted: bool,

    pub status: InvoiceStatus,
    pub fp: String,
    pub data: Value,

    /// Epoch seconds.
    pub created_at: i64,
    /// Epoch seconds.
    pub updated_at: i64,
}

impl From<&InvoiceRecord> for PushRecord {
    fn from(inv: &InvoiceRecord) -> Self {
        PushRecord {
            local_id: inv.id.clone(),
            cloud_id: (!inv.cloud_id.is_empty()).then(|| inv.cloud_id.clone()),
            deleted: inv.deleted,
            status: inv.status,
            fp: inv.fp.clone(),
            data: inv.data.clone(),
            created_at: inv.created_at / 1000,
            updated_at: inv.updated_at / 1000,
        }
    }
}

/// Push endpoint response: one cloud id per submitted record, aligned by
/// array position to the request.
#[derive(Debug, Clone, Deserialize)]
pub struct PushResponse {
    pub cloud_ids: Vec<String>,
}

/// One invoice as returned by the pull endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteInvoice {
    /// Local id of the device that created the record; absent for invoices
    /// first seen from the cloud (e.g. created on another device).
    pub local_id: Option<String>,

    pub cloud_id: String,
    pub deleted: bool,
    pub status: InvoiceStatus,
    pub fp: String,
    pub data: Value,

    /// Epoch seconds.
    pub created_at: i64,
    /// Epoch seconds.
    pub updated_at: i64,
}

impl RemoteInvoice {
    /// Converts this remote record into a local one.
    ///
    /// A record that just arrived from the cloud is known-synced by
    /// definition. When the remote carries no local id (first seen from the
    /// cloud), a fresh one is generated and kept stable from here on.
    pub fn into_record(self) -> InvoiceRecord {
        InvoiceRecord {
            id: self
                .local_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            status: self.status,
            fp: self.fp,
            data: self.data,
            created_at: self.created_at * 1000,
            updated_at: self.updated_at * 1000,
            synced_to_cloud: true,
            deleted: self.deleted,
            cloud_id: self.cloud_id,
        }
    }
}

/// Pull endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct PullResponse {
    pub invoices: Vec<RemoteInvoice>,
}

/// Which half of the sync cycle is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Push,
    Pull,
}

/// Per-record progress report, fired after each record's local write
/// completes.
#[derive(Debug, Clone, Copy)]
pub struct SyncProgress {
    pub phase: SyncPhase,
    pub current: usize,
    pub total: usize,
}

/// Result of one `perform_cloud_sync` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another cycle was already running; this invocation did nothing.
    Skipped,
    /// The cycle ran to completion and the checkpoint advanced.
    Completed { pushed: usize, pulled: usize },
}
