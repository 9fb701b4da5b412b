use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{InvoiceRecord, InvoiceStatus, InvoiceUpdate};
use crate::period::derive_period_key;

/// Durable, indexed store for invoice records.
///
/// One logical table keyed by the client-generated invoice id, with
/// secondary indexes for period, status and sync-state scans. Deletion is
/// always a soft delete: rows become tombstones that keep propagating to the
/// cloud and are filtered out of every read path that feeds UI listings or
/// return generation.
///
/// Every write completes its SQLite statement before the future resolves,
/// so nothing is buffered across a process restart.
#[derive(Debug, Clone)]
pub struct InvoiceStore {
    pool: SqlitePool,
}

impl InvoiceStore {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceStore { pool }
    }

    /// Point lookup by local id. Returns tombstones too; callers that must
    /// not see them go through the list methods instead.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<InvoiceRecord>, StoreError> {
        let record = sqlx::query_as::<_, InvoiceRecord>(
            "SELECT id, status, fp, data, created_at, updated_at,
                    synced_to_cloud, deleted, cloud_id
             FROM invoices WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Creates or overwrites an invoice from a canonical payload.
    ///
    /// The id is taken from `payload["_local_id"]` when present (save-over of
    /// an existing record), otherwise freshly generated; either way it is
    /// embedded back into `data` so UI state can join on it. The filing
    /// period is recomputed from `payload["invoice_date"]` on every save, so
    /// a corrected date moves the invoice into the right return.
    ///
    /// `created_at` is preserved for existing rows (falling back to a
    /// caller-supplied `payload["created_at"]`, then to now), `cloud_id` is
    /// preserved for rows that have already been pushed, and the record is
    /// always marked dirty for the next sync cycle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyDeleted`] if the target id belongs to a
    /// tombstoned row.
    pub async fn save_draft(
        &self,
        payload: Value,
        status: InvoiceStatus,
    ) -> Result<String, StoreError> {
        let id = payload
            .get("_local_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let existing = self.get_by_id(&id).await?;
        if existing.as_ref().is_some_and(|inv| inv.deleted) {
            return Err(StoreError::AlreadyDeleted(id));
        }

        let fp = derive_period_key(payload.get("invoice_date").and_then(|v| v.as_str()));

        let now = now_ms();
        let created_at = existing
            .as_ref()
            .map(|inv| inv.created_at)
            .or_else(|| payload.get("created_at").and_then(|v| v.as_i64()))
            .unwrap_or(now);
        let cloud_id = existing
            .as_ref()
            .map(|inv| inv.cloud_id.clone())
            .unwrap_or_default();

        let mut data = payload;
        if let Some(obj) = data.as_object_mut() {
            obj.insert("_local_id".to_string(), Value::String(id.clone()));
        }

        let record = InvoiceRecord {
            id: id.clone(),
            status,
            fp,
            data,
            created_at,
            updated_at: now,
            synced_to_cloud: false,
            deleted: false,
            cloud_id,
        };

        self.put(&record).await?;
        debug!("Saved invoice {} (status={}, fp={})", record.id, record.status, record.fp);

        Ok(id)
    }

    /// Raw replace-or-insert of a full record.
    ///
    /// Used exclusively by the sync pull path: no period derivation, no
    /// dirty-flag bookkeeping; the caller's record is trusted as-is.
    pub async fn upsert(&self, record: &InvoiceRecord) -> Result<(), StoreError> {
        self.put(record).await
    }

    /// Applies a partial update to an existing record.
    ///
    /// `data` is shallow-merged (provided fields override, the rest of the
    /// payload survives); `status`, `synced_to_cloud`, `cloud_id` and
    /// `deleted` are replaced when provided. Any `data` write marks the
    /// record dirty unless the caller supplies an explicit sync flag in the
    /// same call. `updated_at` is always refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the id is absent, and
    /// [`StoreError::AlreadyDeleted`] if the row is tombstoned and the update
    /// is neither a restore nor purely sync bookkeeping.
    pub async fn update(&self, id: &str, update: InvoiceUpdate) -> Result<(), StoreError> {
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let restoring = update.deleted == Some(false);
        if existing.deleted && !restoring && !update.is_bookkeeping_only() {
            return Err(StoreError::AlreadyDeleted(id.to_string()));
        }

        let data_provided = update.data.is_some();
        let data = match update.data {
            Some(partial) => merge_payload(existing.data, partial),
            None => existing.data,
        };

        // An explicit sync flag wins; otherwise a payload write resets the
        // record to dirty so the edit reaches the cloud on the next push.
        let synced_to_cloud = match update.synced_to_cloud {
            Some(flag) => flag,
            None if data_provided => false,
            None => existing.synced_to_cloud,
        };

        let record = InvoiceRecord {
            id: existing.id,
            status: update.status.unwrap_or(existing.status),
            fp: existing.fp,
            data,
            created_at: existing.created_at,
            updated_at: now_ms(),
            synced_to_cloud,
            deleted: update.deleted.unwrap_or(existing.deleted),
            cloud_id: update.cloud_id.unwrap_or(existing.cloud_id),
        };

        self.put(&record).await
    }

    /// Soft-deletes an invoice.
    ///
    /// Writes a tombstone (`deleted`, dirty) so the deletion propagates to
    /// the remote on the next push. Idempotent: re-deleting a tombstone is a
    /// bookkeeping-only write and succeeds.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.update(
            id,
            InvoiceUpdate {
                deleted: Some(true),
                synced_to_cloud: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Records a successful push acknowledgement for one invoice.
    pub async fn mark_as_synced(&self, id: &str, cloud_id: &str) -> Result<(), StoreError> {
        self.update(
            id,
            InvoiceUpdate {
                synced_to_cloud: Some(true),
                cloud_id: Some(cloud_id.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Full scan of live (non-tombstoned) records. No ordering guarantee;
    /// callers impose their own.
    pub async fn list_all(&self) -> Result<Vec<InvoiceRecord>, StoreError> {
        let records = sqlx::query_as::<_, InvoiceRecord>(
            "SELECT id, status, fp, data, created_at, updated_at,
                    synced_to_cloud, deleted, cloud_id
             FROM invoices WHERE deleted != 1",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Records with local changes not yet pushed. Tombstones are included;
    /// a deletion is a change the remote has to hear about.
    pub async fn list_unsynced(&self) -> Result<Vec<InvoiceRecord>, StoreError> {
        let records = sqlx::query_as::<_, InvoiceRecord>(
            "SELECT id, status, fp, data, created_at, updated_at,
                    synced_to_cloud, deleted, cloud_id
             FROM invoices WHERE synced_to_cloud = 0",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Live, return-eligible records for one filing period. Drafts are
    /// pending user review and never appear in a return.
    pub async fn list_by_period(&self, fp: &str) -> Result<Vec<InvoiceRecord>, StoreError> {
        let records = sqlx::query_as::<_, InvoiceRecord>(
            "SELECT id, status, fp, data, created_at, updated_at,
                    synced_to_cloud, deleted, cloud_id
             FROM invoices
             WHERE fp = ? AND deleted != 1 AND status IN ('confirmed', 'auto_saved')",
        )
        .bind(fp)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn put(&self, record: &InvoiceRecord) -> Result<(), StoreError> {
        let data_text = serde_json::to_string(&record.data)?;

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, status, fp, data, created_at, updated_at,
                synced_to_cloud, deleted, cloud_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                fp = excluded.fp,
                data = excluded.data,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                synced_to_cloud = excluded.synced_to_cloud,
                deleted = excluded.deleted,
                cloud_id = excluded.cloud_id
            "#,
        )
        .bind(&record.id)
        .bind(record.status.as_str())
        .bind(&record.fp)
        .bind(data_text)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.synced_to_cloud as i64)
        .bind(record.deleted as i64)
        .bind(&record.cloud_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Shallow object merge: partial keys override, everything else survives.
/// Non-object partials replace the payload outright.
fn merge_payload(existing: Value, partial: Value) -> Value {
    match (existing, partial) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, partial) => partial,
    }
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use serde_json::json;

    async fn test_store() -> InvoiceStore {
        let pool = create_memory_pool().await.expect("memory pool");
        InvoiceStore::new(pool)
    }

    #[tokio::test]
    async fn save_draft_generates_id_and_embeds_it() {
        let store = test_store().await;

        let id = store
            .save_draft(
                json!({"invoice_number": "INV-001", "invoice_date": "15-03-2024"}),
                InvoiceStatus::Draft,
            )
            .await
            .unwrap();

        let record = store.get_by_id(&id).await.unwrap().expect("record exists");
        assert_eq!(record.data["_local_id"], json!(id));
        assert_eq!(record.fp, "032024");
        assert!(!record.synced_to_cloud);
        assert_eq!(record.cloud_id, "");
    }

    #[tokio::test]
    async fn resaving_same_local_id_is_idempotent_on_created_at() {
        let store = test_store().await;

        let payload = json!({"invoice_number": "INV-002", "invoice_date": "05-Jan-2025"});
        let id = store
            .save_draft(payload.clone(), InvoiceStatus::AutoSaved)
            .await
            .unwrap();
        let first = store.get_by_id(&id).await.unwrap().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let mut resave = payload;
        resave["_local_id"] = json!(id);
        let id_again = store
            .save_draft(resave, InvoiceStatus::AutoSaved)
            .await
            .unwrap();
        assert_eq!(id, id_again);

        let second = store.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn save_draft_preserves_cloud_id_on_resave() {
        let store = test_store().await;

        let id = store
            .save_draft(json!({"invoice_date": "01-02-2025"}), InvoiceStatus::Confirmed)
            .await
            .unwrap();
        store.mark_as_synced(&id, "cloud-42").await.unwrap();

        store
            .save_draft(
                json!({"_local_id": id, "invoice_date": "01-02-2025", "pos": "27"}),
                InvoiceStatus::Confirmed,
            )
            .await
            .unwrap();

        let record = store.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(record.cloud_id, "cloud-42");
        assert!(!record.synced_to_cloud, "a resave is a local change");
    }

    #[tokio::test]
    async fn fp_is_recomputed_when_the_date_changes() {
        let store = test_store().await;

        let id = store
            .save_draft(json!({"invoice_date": "15-01-2025"}), InvoiceStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(store.get_by_id(&id).await.unwrap().unwrap().fp, "012025");

        store
            .save_draft(
                json!({"_local_id": id, "invoice_date": "15-02-2025"}),
                InvoiceStatus::Confirmed,
            )
            .await
            .unwrap();
        assert_eq!(store.get_by_id(&id).await.unwrap().unwrap().fp, "022025");
    }

    #[tokio::test]
    async fn update_merges_payload_and_resets_sync_flag() {
        let store = test_store().await;

        let id = store
            .save_draft(
                json!({"invoice_number": "INV-003", "invoice_date": "10-04-2025", "pos": "07"}),
                InvoiceStatus::Confirmed,
            )
            .await
            .unwrap();
        store.mark_as_synced(&id, "cloud-1").await.unwrap();

        store
            .update(
                &id,
                InvoiceUpdate {
                    data: Some(json!({"pos": "27"})),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let record = store.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(record.data["pos"], json!("27"));
        assert_eq!(record.data["invoice_number"], json!("INV-003"), "merge keeps other fields");
        assert!(!record.synced_to_cloud, "payload write marks the record dirty");
        assert_eq!(record.cloud_id, "cloud-1");
    }

    #[tokio::test]
    async fn update_with_explicit_sync_flag_is_not_reset() {
        let store = test_store().await;

        let id = store
            .save_draft(json!({"invoice_date": "10-04-2025"}), InvoiceStatus::Confirmed)
            .await
            .unwrap();

        store
            .update(
                &id,
                InvoiceUpdate {
                    data: Some(json!({"warning": "checked"})),
                    synced_to_cloud: Some(true),
                    cloud_id: Some("cloud-9".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let record = store.get_by_id(&id).await.unwrap().unwrap();
        assert!(record.synced_to_cloud);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = test_store().await;

        let err = store
            .update("missing", InvoiceUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn soft_delete_is_terminal_until_restored() {
        let store = test_store().await;

        let id = store
            .save_draft(json!({"invoice_date": "01-05-2025"}), InvoiceStatus::Confirmed)
            .await
            .unwrap();
        store.delete(&id).await.unwrap();

        // Payload mutation on a tombstone is rejected.
        let err = store
            .update(
                &id,
                InvoiceUpdate {
                    data: Some(json!({"pos": "33"})),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyDeleted(_)));

        // Save-over of a tombstoned id is rejected too.
        let err = store
            .save_draft(
                json!({"_local_id": id, "invoice_date": "01-05-2025"}),
                InvoiceStatus::Confirmed,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyDeleted(_)));

        // Re-delete is idempotent, sync bookkeeping still flows.
        store.delete(&id).await.unwrap();
        store.mark_as_synced(&id, "cloud-7").await.unwrap();

        // Restore, then payload updates succeed again.
        store
            .update(
                &id,
                InvoiceUpdate {
                    deleted: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .update(
                &id,
                InvoiceUpdate {
                    data: Some(json!({"pos": "33"})),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn listings_filter_tombstones_but_unsynced_keeps_them() {
        let store = test_store().await;

        let live = store
            .save_draft(json!({"invoice_date": "05-Jan-2025"}), InvoiceStatus::AutoSaved)
            .await
            .unwrap();
        let dead = store
            .save_draft(json!({"invoice_date": "05-Jan-2025"}), InvoiceStatus::Confirmed)
            .await
            .unwrap();
        store.delete(&dead).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, live);

        let by_period = store.list_by_period("012025").await.unwrap();
        assert_eq!(by_period.len(), 1);
        assert_eq!(by_period[0].id, live);

        let unsynced = store.list_unsynced().await.unwrap();
        assert_eq!(unsynced.len(), 2, "tombstones must still be pushed");
        assert!(unsynced.iter().any(|inv| inv.id == dead && inv.deleted));
    }

    #[tokio::test]
    async fn period_listing_excludes_drafts_and_other_periods() {
        let store = test_store().await;

        store
            .save_draft(json!({"invoice_date": "05-Jan-2025"}), InvoiceStatus::AutoSaved)
            .await
            .unwrap();
        store
            .save_draft(json!({"invoice_date": "06-Jan-2025"}), InvoiceStatus::Draft)
            .await
            .unwrap();
        store
            .save_draft(json!({"invoice_date": "05-Feb-2025"}), InvoiceStatus::Confirmed)
            .await
            .unwrap();

        assert_eq!(store.list_by_period("012025").await.unwrap().len(), 1);
        assert_eq!(store.list_by_period("022025").await.unwrap().len(), 1);
        assert_eq!(store.list_by_period("032025").await.unwrap().len(), 0);
    }
}
