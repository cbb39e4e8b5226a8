//! Events published around order placement.
//!
//! Payloads carry primitive fields only (names, not aggregates) so subscribers
//! never need to load state to act on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradeflow_core::{AggregateRoot, DomainError, DomainResult, Money, OrderId};
use tradeflow_events::Event;

use crate::order::Order;

/// Event: an order row was created and is about to be settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub username: String,
    pub merchant_name: String,
    pub sku: String,
    pub quantity: u64,
    pub total_price: Money,
    #[serde(default = "Utc::now")]
    pub occurred_on: DateTime<Utc>,
}

/// Event: an order was settled and its transaction committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompleted {
    pub order_id: OrderId,
    pub username: String,
    pub merchant_name: String,
    pub sku: String,
    pub quantity: u64,
    pub total_price: Money,
    #[serde(default = "Utc::now")]
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum OrderEvent {
    Placed(OrderPlaced),
    Completed(OrderCompleted),
}

fn persisted_id(order: &Order) -> DomainResult<OrderId> {
    order
        .id()
        .ok_or_else(|| DomainError::invariant("events can only describe persisted orders"))
}

impl OrderPlaced {
    pub fn new(
        order: &Order,
        username: impl Into<String>,
        merchant_name: impl Into<String>,
        sku: impl Into<String>,
        occurred_on: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            order_id: persisted_id(order)?,
            username: username.into(),
            merchant_name: merchant_name.into(),
            sku: sku.into(),
            quantity: order.quantity().value(),
            total_price: order.total_price(),
            occurred_on,
        })
    }
}

impl OrderCompleted {
    pub fn new(
        order: &Order,
        username: impl Into<String>,
        merchant_name: impl Into<String>,
        sku: impl Into<String>,
        occurred_on: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            order_id: persisted_id(order)?,
            username: username.into(),
            merchant_name: merchant_name.into(),
            sku: sku.into(),
            quantity: order.quantity().value(),
            total_price: order.total_price(),
            occurred_on,
        })
    }
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::Placed(e) => e.order_id,
            OrderEvent::Completed(e) => e.order_id,
        }
    }
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => "orders.order.placed",
            OrderEvent::Completed(_) => "orders.order.completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Placed(e) => e.occurred_on,
            OrderEvent::Completed(e) => e.occurred_on,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::tests::{participants, test_time};
    use tradeflow_core::{Persisted, Quantity};

    fn persisted_order() -> Order {
        let (user, merchant, product) = participants();
        let mut order = Order::create(&user, &merchant, &product, Quantity::of(2).unwrap(), test_time()).unwrap();
        order.mark_inserted(OrderId::new(5));
        order
    }

    #[test]
    fn placed_event_copies_order_facts() {
        let order = persisted_order();
        let event = OrderPlaced::new(&order, "u1", "m1", "sku1", test_time()).unwrap();
        assert_eq!(event.order_id, OrderId::new(5));
        assert_eq!(event.quantity, 2);
        assert_eq!(event.total_price, Money::from_cents(2000));

        let wrapped = OrderEvent::Placed(event);
        assert_eq!(wrapped.event_type(), "orders.order.placed");
        assert_eq!(wrapped.occurred_at(), test_time());
    }

    #[test]
    fn unpersisted_orders_cannot_be_described() {
        let (user, merchant, product) = participants();
        let order = Order::create(&user, &merchant, &product, Quantity::of(1).unwrap(), test_time()).unwrap();
        assert!(OrderCompleted::new(&order, "u1", "m1", "sku1", test_time()).is_err());
    }

    #[test]
    fn missing_occurred_on_defaults_to_now() {
        let before = Utc::now();
        let json = r#"{"type":"Completed","payload":{"order_id":1,"username":"u1","merchant_name":"m1","sku":"sku1","quantity":1,"total_price":"10.00"}}"#;
        let event: OrderEvent = serde_json::from_str(json).unwrap();
        assert!(event.occurred_at() >= before);
        assert_eq!(event.order_id(), OrderId::new(1));
    }
}
