//! Offline-first local persistence and cloud synchronization for GST
//! invoices.
//!
//! The crate's core is a durable SQLite-backed invoice store with soft
//! deletion ([`store::InvoiceStore`]) and a conflict-aware two-way sync
//! engine against a remote authority ([`sync::SyncEngine`]), plus the
//! filing-period derivation and GSTR-1/GSTR-3B aggregation that sit
//! downstream of the store. UI layers consume the store's read/write
//! contract and listen on the [`events::EventBus`] for refresh signals; the
//! store stays fully usable offline regardless of sync health.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod period;
pub mod returns;
pub mod settings;
pub mod store;
pub mod sync;

pub use config::SyncConfig;
pub use error::{RemoteError, StoreError, SyncError};
pub use events::{AppEvent, EventBus};
pub use models::{InvoiceRecord, InvoiceStatus, InvoiceUpdate};
pub use period::{derive_period_key, UNKNOWN_PERIOD};
pub use settings::{AppSettings, SettingsStore};
pub use store::InvoiceStore;
pub use sync::{
    BackgroundSync, HttpInvoiceRemote, InvoiceRemote, SyncEngine, SyncOutcome, SyncPhase,
    SyncProgress, SyncStatus,
};
