use serde::{Deserialize, Serialize};

use tradeflow_core::{
    AggregateRoot, DomainError, DomainResult, MerchantId, Money, Persisted, natural_key,
};

/// Aggregate root: a seller's book.
///
/// The balance only moves through order settlement, so at any time it equals
/// the sum of the totals of the merchant's completed orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantAccount {
    id: Option<MerchantId>,
    name: String,
    balance: Money,
    version: u64,
}

impl MerchantAccount {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        Ok(Self {
            id: None,
            name: natural_key(name.into(), "merchant name")?,
            balance: Money::zero(),
            version: 0,
        })
    }

    /// Rebuild an account from a stored row.
    pub fn restore(id: MerchantId, name: String, balance: Money, version: u64) -> Self {
        Self {
            id: Some(id),
            name,
            balance,
            version,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn credit(&mut self, amount: Money) -> DomainResult<()> {
        let amount = amount.ensure_positive("credit amount")?;
        self.balance = self.balance.add(amount)?;
        Ok(())
    }

    pub fn debit(&mut self, amount: Money) -> DomainResult<()> {
        let amount = amount.ensure_positive("debit amount")?;
        if self.balance.is_less_than(&amount) {
            return Err(DomainError::InsufficientBalance {
                required: amount,
                available: self.balance,
            });
        }
        self.balance = self.balance.subtract(amount)?;
        Ok(())
    }
}

impl AggregateRoot for MerchantAccount {
    type Id = MerchantId;

    fn id(&self) -> Option<Self::Id> {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Persisted for MerchantAccount {
    fn mark_inserted(&mut self, id: Self::Id) {
        self.id = Some(id);
        self.version = 0;
    }

    fn mark_updated(&mut self) {
        self.version += 1;
    }
}
