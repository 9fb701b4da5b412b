use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::fmt;
use std::str::FromStr;

/// Invoice status enumeration.
///
/// `Draft` records are provisional (pending user review) and are excluded
/// from sync and from return generation. `AutoSaved` and `Confirmed` records
/// are both sync-eligible and return-eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    AutoSaved,
    Confirmed,
}

impl InvoiceStatus {
    /// Returns the status as its stored text form.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::AutoSaved => "auto_saved",
            InvoiceStatus::Confirmed => "confirmed",
        }
    }

    /// Whether this record may be pushed to the cloud and aggregated into
    /// period returns.
    pub fn is_sync_eligible(&self) -> bool {
        !matches!(self, InvoiceStatus::Draft)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "auto_saved" => Ok(InvoiceStatus::AutoSaved),
            "confirmed" => Ok(InvoiceStatus::Confirmed),
            other => Err(format!("unknown invoice status: {}", other)),
        }
    }
}

/// A locally stored invoice record.
///
/// This struct maps to the `invoices` table and carries the sync metadata
/// for offline-first synchronization: a dirty flag, a soft-delete tombstone
/// and the remote-assigned id once the record has been pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Stable local identifier, generated once at creation. Primary key and
    /// join key back to UI state (also embedded as `_local_id` in `data`).
    pub id: String,

    /// Review/sync lifecycle state.
    pub status: InvoiceStatus,

    /// Derived filing-period key ("MMYYYY"), or "UNKNOWN" when the invoice
    /// date could not be parsed.
    pub fp: String,

    /// Canonical invoice payload (seller/buyer GSTIN, tax amounts, etc.).
    /// Opaque to the store; merged, not replaced, on partial update.
    pub data: Value,

    /// Creation timestamp (epoch ms). Set once, preserved across updates.
    pub created_at: i64,

    /// Last-write timestamp (epoch ms). Refreshed on every write.
    pub updated_at: i64,

    /// False means the record has local changes not yet reflected remotely.
    pub synced_to_cloud: bool,

    /// Soft-delete tombstone. Deletion never removes the row; the tombstone
    /// propagates to the remote on the next push.
    pub deleted: bool,

    /// Remote-assigned identifier, empty until the first successful push.
    pub cloud_id: String,
}

impl FromRow<'_, SqliteRow> for InvoiceRecord {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status_text: String = row.try_get("status")?;
        let status = InvoiceStatus::from_str(&status_text)
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        let data_text: String = row.try_get("data")?;
        let data: Value = serde_json::from_str(&data_text)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(InvoiceRecord {
            id: row.try_get("id")?,
            status,
            fp: row.try_get("fp")?,
            data,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            synced_to_cloud: row.try_get::<i64, _>("synced_to_cloud")? != 0,
            deleted: row.try_get::<i64, _>("deleted")? != 0,
            cloud_id: row.try_get("cloud_id")?,
        })
    }
}

/// Partial update applied to an existing invoice record.
///
/// Only the provided fields change; `data` is shallow-merged into the
/// existing payload rather than replacing it.
#[derive(Debug, Clone, Default)]
pub struct InvoiceUpdate {
    pub data: Option<Value>,
    pub status: Option<InvoiceStatus>,
    pub synced_to_cloud: Option<bool>,
    pub cloud_id: Option<String>,
    pub deleted: Option<bool>,
}

impl InvoiceUpdate {
    /// Whether this update leaves the payload and status untouched, i.e. it
    /// only adjusts sync bookkeeping or the tombstone flag. Such updates are
    /// the only mutations permitted on a tombstoned record.
    pub fn is_bookkeeping_only(&self) -> bool {
        self.data.is_none() && self.status.is_none()
    }
}
