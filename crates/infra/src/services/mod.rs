//! Application services: the entry points transports call.
//!
//! Each service owns an `Arc` to the store and opens its own transactions.
//! None of them retry; [`ServiceError::is_retryable`] tells the caller when a
//! retry makes sense.

pub mod accounts;
pub mod error;
pub mod inventory;
pub mod placement;
pub mod queries;
pub mod settlement;

pub use accounts::AccountService;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use inventory::InventoryService;
pub use placement::OrderPlacementFlow;
pub use queries::OrderQueries;
pub use settlement::{SettlementEngine, SettlementReport, SettlementResult};

use std::sync::Arc;
use std::time::Duration;

use tradeflow_core::Clock;
use tradeflow_events::InMemoryEventBus;
use tradeflow_orders::OrderEvent;

use crate::locks::KeyLocks;
use crate::store::Store;

/// Bus type shared by the placement flow and its subscribers.
pub type OrderEventBus = Arc<InMemoryEventBus<OrderEvent>>;

/// Every service over one store, bus and clock.
pub struct TradingServices<S> {
    pub accounts: AccountService<S>,
    pub inventory: InventoryService<S>,
    pub placement: OrderPlacementFlow<S, OrderEventBus>,
    pub orders: OrderQueries<S>,
    pub settlement: SettlementEngine<S>,
    pub bus: OrderEventBus,
    pub clock: Arc<dyn Clock>,
}

impl<S: Store> TradingServices<S> {
    /// `sku_lock_timeout`: `Some` puts a process-local per-SKU lock in front of placement.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, sku_lock_timeout: Option<Duration>) -> Self {
        let bus: OrderEventBus = Arc::new(InMemoryEventBus::new());

        let mut placement = OrderPlacementFlow::new(Arc::clone(&store), Arc::clone(&bus), Arc::clone(&clock));
        if let Some(timeout) = sku_lock_timeout {
            placement = placement.with_sku_locks(Arc::new(KeyLocks::new()), timeout);
        }

        Self {
            accounts: AccountService::new(Arc::clone(&store)),
            inventory: InventoryService::new(Arc::clone(&store)),
            placement,
            orders: OrderQueries::new(Arc::clone(&store)),
            settlement: SettlementEngine::new(store),
            bus,
            clock,
        }
    }
}
