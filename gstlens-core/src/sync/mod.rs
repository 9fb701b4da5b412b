pub mod engine;
pub mod pull;
pub mod push;
pub mod remote;
pub mod scheduler;
pub mod types;


pub use engine::{format_last_sync, SyncEngine, SyncStatus};
pub use pull::pull_new_invoices;
pub use push::push_unsynced_invoices;
pub use remote::{HttpInvoiceRemote, InvoiceRemote};
pub use scheduler::{BackgroundSync, DEFAULT_SYNC_INTERVAL_MS};
pub use types::*;
