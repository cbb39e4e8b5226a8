//! `tradeflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! monetary and quantity value types, typed row identifiers, natural keys, the aggregate
//! contract used by repositories, and the injectable clock.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod id;
pub mod key;
pub mod money;
pub mod quantity;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion, Persisted};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{MerchantId, OrderId, ProductId, RowId, UserAccountId};
pub use key::natural_key;
pub use money::Money;
pub use quantity::Quantity;
pub use value_object::ValueObject;
