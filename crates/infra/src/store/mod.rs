//! State store boundary: repositories bound to a transaction scope.
//!
//! Every repository operation runs inside a [`StoreTransaction`] obtained from
//! a [`Store`]. Updates are version-checked (optimistic concurrency) and report
//! the number of affected rows; a stale version affects zero rows and the
//! caller decides what that means.

pub mod error;
pub mod in_memory;
pub mod postgres;
pub mod repository;

pub use error::StoreError;
pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use repository::{
    MerchantAccountRepository, OrderRepository, ProductRepository, UserAccountRepository,
};

use tracing::warn;

/// Transaction access mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxMode {
    /// Reads and writes; conflicting writers are detected at update or commit.
    ReadWrite,
    /// Repeatable-read snapshot; any write fails with [`StoreError::ReadOnly`].
    ReadOnly,
}

/// A unit of work over the four aggregate tables.
///
/// Dropping a transaction without committing rolls it back.
pub trait StoreTransaction:
    UserAccountRepository + MerchantAccountRepository + ProductRepository + OrderRepository
{
    fn mode(&self) -> TxMode;

    fn commit(self) -> Result<(), StoreError>;

    fn rollback(self) -> Result<(), StoreError>;
}

/// Transaction factory.
pub trait Store: Send + Sync {
    type Tx<'a>: StoreTransaction
    where
        Self: 'a;

    fn begin(&self, mode: TxMode) -> Result<Self::Tx<'_>, StoreError>;
}

/// Run `work` inside a transaction: commit on `Ok`, roll back on `Err`.
pub fn with_transaction<'s, S, T, E, F>(store: &'s S, mode: TxMode, work: F) -> Result<T, E>
where
    S: Store,
    E: From<StoreError>,
    F: FnOnce(&mut S::Tx<'s>) -> Result<T, E>,
{
    let mut tx = store.begin(mode)?;
    match work(&mut tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback() {
                warn!(error = %rollback, "transaction rollback failed");
            }
            Err(err)
        }
    }
}
