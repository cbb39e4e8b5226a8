//! Settlement: per-merchant reconciliation of booked balance against sales.
//!
//! For every merchant, `expected` is Σ `price × sold_quantity` over its
//! products and `actual` is the merchant balance. A non-zero `diff` means
//! money moved without a matching sale (or the reverse) and is logged at warn.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tradeflow_core::{AggregateRoot, Clock, MerchantId, Money};

use crate::store::{
    MerchantAccountRepository, ProductRepository, Store, TxMode, with_transaction,
};

use super::{ServiceError, ServiceResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementResult {
    pub merchant_name: String,
    pub expected: Money,
    pub actual: Money,
    pub diff: Money,
}

impl SettlementResult {
    pub fn is_balanced(&self) -> bool {
        self.diff.is_zero()
    }
}

/// One settlement pass, as kept by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementReport {
    pub run_id: Uuid,
    pub run_at: DateTime<Utc>,
    pub results: Vec<SettlementResult>,
}

impl SettlementReport {
    pub fn unbalanced(&self) -> impl Iterator<Item = &SettlementResult> {
        self.results.iter().filter(|r| !r.is_balanced())
    }
}

#[derive(Debug)]
pub struct SettlementEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for SettlementEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> SettlementEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Reconcile every merchant inside one read-only snapshot.
    ///
    /// Results are in merchant id order. Calling this twice without
    /// intervening writes returns equal results.
    #[instrument(skip(self), err)]
    pub fn settle(&self) -> ServiceResult<Vec<SettlementResult>> {
        let (merchants, products) = with_transaction(&*self.store, TxMode::ReadOnly, |tx| {
            let merchants = tx.list_merchants()?;
            let products = tx.list_products()?;
            Ok::<_, ServiceError>((merchants, products))
        })?;

        let mut expected_by_merchant: HashMap<MerchantId, Money> = HashMap::new();
        for product in &products {
            let sales = product.price().multiply(product.sold_quantity().value())?;
            let entry = expected_by_merchant
                .entry(product.merchant_id())
                .or_insert_with(Money::zero);
            *entry = entry.add(sales)?;
        }

        let mut results = Vec::with_capacity(merchants.len());
        for merchant in &merchants {
            let expected = merchant
                .id()
                .and_then(|id| expected_by_merchant.get(&id).copied())
                .unwrap_or_else(Money::zero);
            let actual = merchant.balance();
            let diff = actual.subtract(expected)?;

            if diff.is_zero() {
                info!(merchant = merchant.name(), %expected, %actual, "merchant settled");
            } else {
                warn!(merchant = merchant.name(), %expected, %actual, %diff, "merchant settlement mismatch");
            }

            results.push(SettlementResult {
                merchant_name: merchant.name().to_string(),
                expected,
                actual,
                diff,
            });
        }

        Ok(results)
    }

    /// [`settle`](Self::settle) wrapped in a timestamped report.
    pub fn run(&self, clock: &dyn Clock) -> ServiceResult<SettlementReport> {
        let results = self.settle()?;
        let report = SettlementReport {
            run_id: Uuid::now_v7(),
            run_at: clock.now(),
            results,
        };
        info!(
            run_id = %report.run_id,
            merchants = report.results.len(),
            unbalanced = report.unbalanced().count(),
            "settlement run finished"
        );
        Ok(report)
    }
}
