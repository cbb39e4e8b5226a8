use std::sync::Arc;

use tradeflow_core::OrderId;
use tradeflow_orders::Order;

use crate::store::{OrderRepository, Store, TxMode, with_transaction};

use super::{ServiceError, ServiceResult};

/// Read-only order lookups.
#[derive(Debug)]
pub struct OrderQueries<S> {
    store: Arc<S>,
}

impl<S> Clone for OrderQueries<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> OrderQueries<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn find_order(&self, id: OrderId) -> ServiceResult<Order> {
        with_transaction(&*self.store, TxMode::ReadOnly, |tx| {
            tx.find_order_by_id(id)?.ok_or(ServiceError::OrderNotFound(id))
        })
    }
}
