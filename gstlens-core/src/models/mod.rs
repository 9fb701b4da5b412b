pub mod invoice;

pub use invoice::{InvoiceRecord, InvoiceStatus, InvoiceUpdate};
