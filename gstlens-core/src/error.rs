use thiserror::Error;

/// Errors raised by the local invoice store.
///
/// Store errors are programmer-facing: they indicate a stale reference or a
/// guarded mutation, and are surfaced to the caller as rejected operations
/// rather than silently swallowed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Update targets an id that does not exist locally.
    #[error("invoice not found: {0}")]
    NotFound(String),

    /// Attempt to mutate the payload or status of a tombstoned record.
    #[error("invoice already deleted: {0}")]
    AlreadyDeleted(String),

    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invoice payload could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the remote sync endpoints.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote rejected sync because the account has no active
    /// subscription. Distinguished from generic failures so the caller can
    /// show a clearer message and stop auto-retrying.
    #[error("cloud sync requires an active subscription")]
    EntitlementRequired,

    /// The remote answered, but not with what the protocol promises
    /// (e.g. a cloud_id count that does not match the pushed batch).
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Non-success HTTP response.
    #[error("remote request failed ({status}): {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure (DNS, connect, timeout, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Errors raised by a sync cycle.
///
/// Sync errors are user-facing but non-fatal: the local store remains fully
/// usable offline regardless of sync health. A failed cycle leaves the
/// checkpoint untouched so the same window is retried in full next time.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Whether this failure is the missing-subscription case, which callers
    /// message differently and do not retry automatically.
    pub fn is_entitlement(&self) -> bool {
        matches!(self, SyncError::Remote(RemoteError::EntitlementRequired))
    }
}
