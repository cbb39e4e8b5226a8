//! Orders domain module.
//!
//! This crate contains the order aggregate, the coordinator that settles an
//! order against its buyer, seller and product, and the events published
//! around placement. Pure domain logic (no IO, no HTTP, no storage).

pub mod coordinator;
pub mod events;
pub mod order;

pub use coordinator::OrderCoordinator;
pub use events::{OrderCompleted, OrderEvent, OrderPlaced};
pub use order::{Order, OrderStatus};
