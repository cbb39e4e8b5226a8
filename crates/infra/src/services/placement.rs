//! Order placement: the transactional path from a buy request to a completed order.
//!
//! ```text
//! place_order(username, sku, qty)
//!   ↓
//! [optional] per-SKU key lock
//!   ↓
//! tx A: load user, product, merchant → Quantity::of → Order::create → insert (status CREATED) → commit
//!   ↓
//! publish OrderPlaced (best-effort)
//!   ↓
//! tx B: OrderCoordinator::execute → version-checked update of product, user, merchant, order → commit
//!   ↓                                   ↘ on failure: tx C marks the order FAILED
//! publish OrderCompleted
//! ```
//!
//! Nothing here retries. A [`ServiceError::ConcurrencyConflict`] tells the
//! caller that retrying the same request may succeed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use tradeflow_accounts::{MerchantAccount, UserAccount};
use tradeflow_core::{AggregateRoot, Clock, OrderId, Quantity, natural_key};
use tradeflow_events::EventBus;
use tradeflow_orders::{Order, OrderCompleted, OrderCoordinator, OrderEvent, OrderPlaced};
use tradeflow_products::Product;

use crate::locks::KeyLocks;
use crate::store::{
    MerchantAccountRepository, OrderRepository, ProductRepository, Store, TxMode,
    UserAccountRepository, with_transaction,
};

use super::{ServiceError, ServiceResult};

/// The four aggregates one placement touches.
#[derive(Debug, Clone)]
struct Placement {
    order: Order,
    user: UserAccount,
    merchant: MerchantAccount,
    product: Product,
}

/// Application service behind `place_order`.
pub struct OrderPlacementFlow<S, B> {
    store: Arc<S>,
    bus: B,
    clock: Arc<dyn Clock>,
    coordinator: OrderCoordinator,
    sku_locks: Option<(Arc<KeyLocks>, Duration)>,
}

impl<S, B> core::fmt::Debug for OrderPlacementFlow<S, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OrderPlacementFlow")
            .field("sku_locks", &self.sku_locks.as_ref().map(|(_, timeout)| timeout))
            .finish_non_exhaustive()
    }
}

impl<S, B> OrderPlacementFlow<S, B>
where
    S: Store,
    B: EventBus<OrderEvent>,
{
    pub fn new(store: Arc<S>, bus: B, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            bus,
            clock,
            coordinator: OrderCoordinator::new(),
            sku_locks: None,
        }
    }

    /// Serialise placements of the same SKU inside this process.
    pub fn with_sku_locks(mut self, locks: Arc<KeyLocks>, timeout: Duration) -> Self {
        self.sku_locks = Some((locks, timeout));
        self
    }

    /// Place and settle an order for `quantity` units of `sku`.
    ///
    /// On success the returned order is `COMPLETED`. If settlement fails after
    /// the order row exists, the row is marked `FAILED` and the settlement error
    /// is returned.
    #[instrument(skip(self), err)]
    pub fn place_order(&self, username: &str, sku: &str, quantity: i64) -> ServiceResult<Order> {
        let username = natural_key(username, "username")?;
        let sku = natural_key(sku, "sku")?;

        let _guard = match &self.sku_locks {
            Some((locks, timeout)) => Some(locks.acquire(&sku, *timeout)?),
            None => None,
        };

        let placed = self.create_order(&username, &sku, quantity)?;
        let order_id = placed
            .order
            .id()
            .ok_or_else(|| ServiceError::Integrity("inserted order has no id".into()))?;

        self.publish_placed(&placed);

        match self.settle_order(placed.clone()) {
            Ok(done) => {
                info!(
                    order_id = %order_id,
                    username = done.user.username(),
                    sku = done.product.sku(),
                    quantity = %done.order.quantity(),
                    total = %done.order.total_price(),
                    "order completed"
                );
                self.publish_completed(&done);
                Ok(done.order)
            }
            Err(err) => {
                warn!(order_id = %order_id, error = %err, "order settlement failed");
                self.mark_failed(order_id);
                Err(err)
            }
        }
    }

    fn create_order(&self, username: &str, sku: &str, quantity: i64) -> ServiceResult<Placement> {
        let now = self.clock.now();
        with_transaction(&*self.store, TxMode::ReadWrite, |tx| {
            let user = tx
                .find_user_by_username(username)?
                .ok_or_else(|| ServiceError::UserNotFound(username.to_string()))?;
            let product = tx
                .find_product_by_sku(sku)?
                .ok_or_else(|| ServiceError::ProductNotFound(sku.to_string()))?;
            let merchant = match tx.find_merchant_by_id(product.merchant_id())? {
                Some(merchant) => merchant,
                None => {
                    error!(
                        sku = product.sku(),
                        merchant_id = %product.merchant_id(),
                        "product references a missing merchant"
                    );
                    return Err(ServiceError::MerchantNotFound(product.merchant_id().to_string()));
                }
            };

            let quantity = Quantity::of(quantity)?;
            let mut order = Order::create(&user, &merchant, &product, quantity, now)?;
            tx.insert_order(&mut order)?;

            Ok(Placement {
                order,
                user,
                merchant,
                product,
            })
        })
    }

    fn settle_order(&self, mut placement: Placement) -> ServiceResult<Placement> {
        with_transaction(&*self.store, TxMode::ReadWrite, |tx| {
            let Placement {
                order,
                user,
                merchant,
                product,
            } = &mut placement;

            self.coordinator.execute(order, user, merchant, product)?;

            ensure_written(tx.update_product(product)?, "products", product.sku())?;
            ensure_written(tx.update_user(user)?, "user_accounts", user.username())?;
            ensure_written(tx.update_merchant(merchant)?, "merchant_accounts", merchant.name())?;
            let order_label = order.id().map(|id| id.to_string()).unwrap_or_default();
            ensure_written(tx.update_order(order)?, "orders", &order_label)?;
            Ok::<_, ServiceError>(())
        })?;
        Ok(placement)
    }

    /// Best-effort: a failure here leaves the order `CREATED` and is only logged.
    fn mark_failed(&self, order_id: OrderId) {
        let result = with_transaction(&*self.store, TxMode::ReadWrite, |tx| {
            let mut order = tx
                .find_order_by_id(order_id)?
                .ok_or(ServiceError::OrderNotFound(order_id))?;
            order.mark_failed()?;
            ensure_written(tx.update_order(&mut order)?, "orders", &order_id.to_string())?;
            Ok::<_, ServiceError>(())
        });

        match result {
            Ok(()) => warn!(order_id = %order_id, "order marked failed"),
            Err(err) => error!(order_id = %order_id, error = %err, "could not mark order failed"),
        }
    }

    fn publish_placed(&self, placement: &Placement) {
        let event = OrderPlaced::new(
            &placement.order,
            placement.user.username(),
            placement.merchant.name(),
            placement.product.sku(),
            self.clock.now(),
        );
        match event {
            Ok(event) => self.publish(OrderEvent::Placed(event)),
            Err(err) => warn!(error = %err, "could not build OrderPlaced"),
        }
    }

    fn publish_completed(&self, placement: &Placement) {
        let event = OrderCompleted::new(
            &placement.order,
            placement.user.username(),
            placement.merchant.name(),
            placement.product.sku(),
            self.clock.now(),
        );
        match event {
            Ok(event) => self.publish(OrderEvent::Completed(event)),
            Err(err) => warn!(error = %err, "could not build OrderCompleted"),
        }
    }

    fn publish(&self, event: OrderEvent) {
        let order_id = event.order_id();
        if let Err(err) = self.bus.publish(event) {
            warn!(order_id = %order_id, error = %err, "event publish failed");
        }
    }
}

fn ensure_written(affected: u64, table: &str, key: &str) -> ServiceResult<()> {
    if affected == 0 {
        return Err(ServiceError::conflict(format!("{table} row {key} was modified concurrently")));
    }
    Ok(())
}
