//! Cross-aggregate settlement of a single order.

use tradeflow_accounts::{MerchantAccount, UserAccount};
use tradeflow_core::{AggregateRoot, DomainError, DomainResult};
use tradeflow_products::Product;

use crate::order::{Order, OrderStatus};

/// Stateless domain service that applies an order to its participants.
///
/// Every check runs before any mutation, and the four aggregates are updated
/// together: on error none of them has changed. Persisting the result is the
/// caller's job.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderCoordinator;

impl OrderCoordinator {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(
        &self,
        order: &mut Order,
        user: &mut UserAccount,
        merchant: &mut MerchantAccount,
        product: &mut Product,
    ) -> DomainResult<()> {
        Self::ensure_linked(order, user, merchant, product)?;
        if order.status() != OrderStatus::Created {
            return Err(DomainError::IllegalOrderTransition {
                from: order.status().to_string(),
                to: OrderStatus::Completed.to_string(),
            });
        }

        let quantity = order.quantity();
        let total = order.total_price();

        if !product.has_stock_for(quantity) {
            return Err(DomainError::InsufficientStock {
                requested: quantity.value(),
                available: product.stock_quantity().value(),
            });
        }
        if user.balance().is_less_than(&total) {
            return Err(DomainError::InsufficientBalance {
                required: total,
                available: user.balance(),
            });
        }

        let mut next_product = product.clone();
        let mut next_user = user.clone();
        let mut next_merchant = merchant.clone();
        let mut next_order = order.clone();

        next_product.sell(quantity)?;
        next_user.withdraw(total)?;
        next_merchant.credit(total)?;
        next_order.mark_completed()?;

        *product = next_product;
        *user = next_user;
        *merchant = next_merchant;
        *order = next_order;
        Ok(())
    }

    fn ensure_linked(
        order: &Order,
        user: &UserAccount,
        merchant: &MerchantAccount,
        product: &Product,
    ) -> DomainResult<()> {
        if user.id() != Some(order.user_id()) {
            return Err(DomainError::invariant("order buyer does not match the loaded user"));
        }
        if merchant.id() != Some(order.merchant_id()) {
            return Err(DomainError::invariant("order merchant does not match the loaded merchant"));
        }
        if product.id() != Some(order.product_id()) {
            return Err(DomainError::invariant("order product does not match the loaded product"));
        }
        if product.merchant_id() != order.merchant_id() {
            return Err(DomainError::invariant("product is not sold by the order merchant"));
        }
        Ok(())
    }
}
