//! Aggregate root contract for persisted (state-stored) domain models.

use crate::id::RowId;

/// Aggregate root marker + minimal interface.
///
/// Aggregates here are state-stored: the repository saves the current state and
/// guards every update with the row version (optimistic concurrency).
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: RowId;

    /// Returns the identifier, or `None` before the first insert.
    fn id(&self) -> Option<Self::Id>;

    /// Row version, incremented on every successful update.
    fn version(&self) -> u64;
}

/// Hooks used by repositories to reflect persistence results back into the
/// in-memory aggregate. Domain code never calls these.
pub trait Persisted: AggregateRoot {
    /// Record the identifier assigned on insert (version starts at 0).
    fn mark_inserted(&mut self, id: Self::Id);

    /// Record a successful version-checked update.
    fn mark_updated(&mut self);
}

/// Optimistic concurrency expectation: the stored row must still be at the
/// version the aggregate was loaded with.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpectedVersion(u64);

impl ExpectedVersion {
    pub fn of<A: AggregateRoot + ?Sized>(aggregate: &A) -> Self {
        ExpectedVersion(aggregate.version())
    }

    pub fn matches(self, actual: u64) -> bool {
        self.0 == actual
    }
}
