//! Per-order activity feed built from `OrderEvent`s.
//!
//! Idempotent under at-least-once delivery: replaying an event leaves the
//! record unchanged. Events may arrive out of order (a completion before its
//! placement); whichever arrives first creates the record.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use tradeflow_core::{Money, OrderId};
use tradeflow_orders::OrderEvent;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("projection state poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderActivity {
    pub order_id: OrderId,
    pub username: String,
    pub merchant_name: String,
    pub sku: String,
    pub quantity: u64,
    pub total_price: Money,
    pub placed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OrderActivity {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Default)]
pub struct OrderActivityProjection {
    rows: Mutex<HashMap<OrderId, OrderActivity>>,
}

impl OrderActivityProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, event: &OrderEvent) -> Result<(), ProjectionError> {
        let mut rows = self.rows.lock().map_err(|_| ProjectionError::Poisoned)?;

        let (order_id, username, merchant_name, sku, quantity, total_price) = match event {
            OrderEvent::Placed(e) => {
                (e.order_id, &e.username, &e.merchant_name, &e.sku, e.quantity, e.total_price)
            }
            OrderEvent::Completed(e) => {
                (e.order_id, &e.username, &e.merchant_name, &e.sku, e.quantity, e.total_price)
            }
        };

        let row = rows.entry(order_id).or_insert_with(|| OrderActivity {
            order_id,
            username: username.clone(),
            merchant_name: merchant_name.clone(),
            sku: sku.clone(),
            quantity,
            total_price,
            placed_at: None,
            completed_at: None,
        });

        // First delivery wins; duplicates keep the original timestamps.
        match event {
            OrderEvent::Placed(e) => {
                row.placed_at.get_or_insert(e.occurred_on);
            }
            OrderEvent::Completed(e) => {
                row.completed_at.get_or_insert(e.occurred_on);
            }
        }

        debug!(order_id = %order_id, completed = row.is_completed(), "order activity updated");
        Ok(())
    }

    pub fn get(&self, order_id: OrderId) -> Option<OrderActivity> {
        self.rows.lock().ok()?.get(&order_id).cloned()
    }

    /// Activity rows sorted by order id.
    pub fn all(&self) -> Vec<OrderActivity> {
        let Ok(rows) = self.rows.lock() else {
            return Vec::new();
        };
        let mut out: Vec<_> = rows.values().cloned().collect();
        out.sort_by_key(|r| r.order_id);
        out
    }
}
