use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradeflow_accounts::{MerchantAccount, UserAccount};
use tradeflow_core::{
    AggregateRoot, DomainError, DomainResult, MerchantId, Money, OrderId, Persisted, ProductId,
    Quantity, UserAccountId,
};
use tradeflow_products::Product;

/// Order status lifecycle: `Created -> Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Completed,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Created)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(OrderStatus::Created),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "FAILED" => Ok(OrderStatus::Failed),
            other => Err(DomainError::validation(format!("unknown order status: {other}"))),
        }
    }
}

/// Aggregate root: a single-line purchase.
///
/// The unit price is snapshotted from the product when the order is created,
/// so later price changes never alter a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: Option<OrderId>,
    user_id: UserAccountId,
    merchant_id: MerchantId,
    product_id: ProductId,
    quantity: Quantity,
    unit_price: Money,
    total_price: Money,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Order {
    /// Create a new order in `Created` status from persisted participants.
    pub fn create(
        user: &UserAccount,
        merchant: &MerchantAccount,
        product: &Product,
        quantity: Quantity,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let user_id = user
            .id()
            .ok_or_else(|| DomainError::invariant("order buyer must be persisted"))?;
        let merchant_id = merchant
            .id()
            .ok_or_else(|| DomainError::invariant("order merchant must be persisted"))?;
        let product_id = product
            .id()
            .ok_or_else(|| DomainError::invariant("order product must be persisted"))?;
        if product.merchant_id() != merchant_id {
            return Err(DomainError::invariant(format!(
                "product {} is not sold by merchant {}",
                product.sku(),
                merchant.name()
            )));
        }
        if quantity.is_zero() {
            return Err(DomainError::invalid_quantity("order quantity must be positive"));
        }

        let unit_price = product.price();
        let total_price = unit_price.multiply(quantity.value())?;

        Ok(Self {
            id: None,
            user_id,
            merchant_id,
            product_id,
            quantity,
            unit_price,
            total_price,
            status: OrderStatus::Created,
            created_at,
            version: 0,
        })
    }

    /// Rebuild an order from a stored row.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: OrderId,
        user_id: UserAccountId,
        merchant_id: MerchantId,
        product_id: ProductId,
        quantity: Quantity,
        unit_price: Money,
        total_price: Money,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        version: u64,
    ) -> Self {
        Self {
            id: Some(id),
            user_id,
            merchant_id,
            product_id,
            quantity,
            unit_price,
            total_price,
            status,
            created_at,
            version,
        }
    }

    pub fn user_id(&self) -> UserAccountId {
        self.user_id
    }

    pub fn merchant_id(&self) -> MerchantId {
        self.merchant_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn mark_completed(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Created {
            return Err(self.illegal_transition(OrderStatus::Completed));
        }
        self.status = OrderStatus::Completed;
        Ok(())
    }

    /// Failing an already failed order is a no-op.
    pub fn mark_failed(&mut self) -> DomainResult<()> {
        if self.status == OrderStatus::Completed {
            return Err(self.illegal_transition(OrderStatus::Failed));
        }
        self.status = OrderStatus::Failed;
        Ok(())
    }

    fn illegal_transition(&self, to: OrderStatus) -> DomainError {
        DomainError::IllegalOrderTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> Option<Self::Id> {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Persisted for Order {
    fn mark_inserted(&mut self, id: Self::Id) {
        self.id = Some(id);
        self.version = 0;
    }

    fn mark_updated(&mut self) {
        self.version += 1;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    pub(crate) fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    /// Persisted buyer (100.00), seller, and product (10.00, 10 in stock).
    pub(crate) fn participants() -> (UserAccount, MerchantAccount, Product) {
        let user = UserAccount::restore(UserAccountId::new(1), "u1".into(), Money::from_cents(10_000), 0);
        let merchant = MerchantAccount::restore(MerchantId::new(1), "m1".into(), Money::zero(), 0);
        let product = Product::restore(
            ProductId::new(1),
            "sku1".into(),
            "X".into(),
            Money::from_cents(1000),
            MerchantId::new(1),
            Quantity::of(10).unwrap(),
            Quantity::zero(),
            0,
        );
        (user, merchant, product)
    }

    #[test]
    fn create_snapshots_price_and_total() {
        let (user, merchant, product) = participants();
        let order = Order::create(&user, &merchant, &product, Quantity::of(3).unwrap(), test_time()).unwrap();
        assert_eq!(order.status(), OrderStatus::Created);
        assert_eq!(order.unit_price(), Money::from_cents(1000));
        assert_eq!(order.total_price(), Money::from_cents(3000));
        assert_eq!(order.created_at(), test_time());
        assert_eq!(order.id(), None);
    }

    #[test]
    fn create_rejects_unpersisted_or_mismatched_participants() {
        let (user, merchant, product) = participants();
        let fresh = UserAccount::new("new").unwrap();
        assert!(matches!(
            Order::create(&fresh, &merchant, &product, Quantity::of(1).unwrap(), test_time()),
            Err(DomainError::InvariantViolation(_))
        ));

        let other = MerchantAccount::restore(MerchantId::new(2), "m2".into(), Money::zero(), 0);
        assert!(matches!(
            Order::create(&user, &other, &product, Quantity::of(1).unwrap(), test_time()),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn completed_is_terminal() {
        let (user, merchant, product) = participants();
        let mut order = Order::create(&user, &merchant, &product, Quantity::of(1).unwrap(), test_time()).unwrap();
        order.mark_completed().unwrap();
        assert_eq!(
            order.mark_failed(),
            Err(DomainError::IllegalOrderTransition { from: "COMPLETED".into(), to: "FAILED".into() })
        );
        assert!(order.mark_completed().is_err());
    }

    #[test]
    fn failing_twice_is_a_noop() {
        let (user, merchant, product) = participants();
        let mut order = Order::create(&user, &merchant, &product, Quantity::of(1).unwrap(), test_time()).unwrap();
        order.mark_failed().unwrap();
        order.mark_failed().unwrap();
        assert_eq!(order.status(), OrderStatus::Failed);
        assert!(order.mark_completed().is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [OrderStatus::Created, OrderStatus::Completed, OrderStatus::Failed] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
        assert_eq!(serde_json::to_string(&OrderStatus::Completed).unwrap(), "\"COMPLETED\"");
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn status_never_leaves_a_terminal_state(ops in prop::collection::vec(any::<bool>(), 1..12)) {
            let (user, merchant, product) = participants();
            let mut order = Order::create(&user, &merchant, &product, Quantity::of(1).unwrap(), test_time()).unwrap();
            let mut terminal: Option<OrderStatus> = None;
            for complete in ops {
                let _ = if complete { order.mark_completed() } else { order.mark_failed() };
                if let Some(t) = terminal {
                    prop_assert_eq!(order.status(), t);
                }
                if order.status().is_terminal() {
                    terminal = Some(order.status());
                }
            }
        }
    }
}
