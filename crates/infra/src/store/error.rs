use thiserror::Error;

/// Storage-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A concurrent writer won (stale version at commit, unique key race).
    #[error("write conflict: {0}")]
    Conflict(String),

    /// A write was attempted inside a read-only transaction.
    #[error("read-only transaction: {0}")]
    ReadOnly(String),

    /// Stored data violates a constraint or cannot be decoded.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The backend itself failed (connection, runtime, poisoned lock).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
