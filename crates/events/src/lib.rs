//! `tradeflow-events`: event contract and in-process distribution.
//!
//! Domain crates define their events by implementing [`Event`]; the
//! infrastructure publishes them through an [`EventBus`] after the owning
//! transaction has committed.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
