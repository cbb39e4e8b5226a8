use serde::{Deserialize, Serialize};

use tradeflow_core::{
    AggregateRoot, DomainError, DomainResult, MerchantId, Money, Persisted, ProductId, Quantity,
    natural_key,
};

/// Aggregate root: a merchant's product and its stock counters.
///
/// Invariants:
/// - `price > 0`
/// - the owning merchant never changes after creation
/// - `stock_quantity + sold_quantity` equals the total units ever added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: Option<ProductId>,
    sku: String,
    name: String,
    price: Money,
    merchant_id: MerchantId,
    stock_quantity: Quantity,
    sold_quantity: Quantity,
    version: u64,
}

impl Product {
    /// A new, not-yet-persisted product with no stock.
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        merchant_id: MerchantId,
    ) -> DomainResult<Self> {
        let sku = natural_key(sku.into(), "sku")?;
        let name = natural_key(name.into(), "product name")?;
        let price = price.ensure_positive("price")?;

        Ok(Self {
            id: None,
            sku,
            name,
            price,
            merchant_id,
            stock_quantity: Quantity::zero(),
            sold_quantity: Quantity::zero(),
            version: 0,
        })
    }

    /// Rebuild a product from a stored row.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: ProductId,
        sku: String,
        name: String,
        price: Money,
        merchant_id: MerchantId,
        stock_quantity: Quantity,
        sold_quantity: Quantity,
        version: u64,
    ) -> Self {
        Self {
            id: Some(id),
            sku,
            name,
            price,
            merchant_id,
            stock_quantity,
            sold_quantity,
            version,
        }
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn merchant_id(&self) -> MerchantId {
        self.merchant_id
    }

    pub fn stock_quantity(&self) -> Quantity {
        self.stock_quantity
    }

    pub fn sold_quantity(&self) -> Quantity {
        self.sold_quantity
    }

    pub fn has_stock_for(&self, quantity: Quantity) -> bool {
        self.stock_quantity >= quantity
    }

    /// Fail unless the product belongs to `merchant_id`.
    pub fn ensure_owned_by(&self, merchant_id: MerchantId) -> DomainResult<()> {
        if self.merchant_id != merchant_id {
            return Err(DomainError::ProductBelongsToAnotherMerchant { sku: self.sku.clone() });
        }
        Ok(())
    }

    /// Add units to stock. Adding zero is a no-op.
    pub fn add_stock(&mut self, quantity: Quantity) -> DomainResult<()> {
        if quantity.is_zero() {
            return Ok(());
        }
        self.stock_quantity = self.stock_quantity.add(quantity)?;
        Ok(())
    }

    /// Move units from stock to sold.
    pub fn sell(&mut self, quantity: Quantity) -> DomainResult<()> {
        if quantity.is_zero() {
            return Err(DomainError::invalid_quantity("sell quantity must be positive"));
        }
        if !self.has_stock_for(quantity) {
            return Err(DomainError::InsufficientStock {
                requested: quantity.value(),
                available: self.stock_quantity.value(),
            });
        }
        let stock = self.stock_quantity.deduct(quantity)?;
        let sold = self.sold_quantity.add(quantity)?;
        self.stock_quantity = stock;
        self.sold_quantity = sold;
        Ok(())
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> Option<Self::Id> {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Persisted for Product {
    fn mark_inserted(&mut self, id: Self::Id) {
        self.id = Some(id);
        self.version = 0;
    }

    fn mark_updated(&mut self) {
        self.version += 1;
    }
}
