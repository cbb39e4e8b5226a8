use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};

use tradeflow_accounts::MerchantAccount;
use tradeflow_core::{AggregateRoot, DomainError, Money, Quantity, natural_key};
use tradeflow_products::Product;

use crate::store::{
    MerchantAccountRepository, ProductRepository, Store, TxMode, with_transaction,
};

use super::{ServiceError, ServiceResult};

/// Merchant catalogue and stock.
#[derive(Debug)]
pub struct InventoryService<S> {
    store: Arc<S>,
}

impl<S> Clone for InventoryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> InventoryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Add `quantity` units of `sku` to `merchant_name`'s stock.
    ///
    /// Creates the merchant and the product on first use. An existing product
    /// keeps its name and price; only its stock changes.
    #[instrument(skip(self), err)]
    pub fn add_or_update_product_stock(
        &self,
        merchant_name: &str,
        sku: &str,
        name: &str,
        price: Decimal,
        quantity: i64,
    ) -> ServiceResult<Product> {
        let quantity = Quantity::of(quantity)?;
        let price = Money::new(price)?;
        let sku = natural_key(sku, "sku")?;
        let merchant_candidate = MerchantAccount::new(merchant_name)?;

        let product = with_transaction(&*self.store, TxMode::ReadWrite, |tx| {
            let merchant = tx.upsert_merchant(merchant_candidate)?;
            let merchant_id = merchant
                .id()
                .ok_or_else(|| DomainError::invariant("stored merchant has no id"))?;

            let mut product = match tx.find_product_by_sku(&sku)? {
                Some(existing) => existing,
                None => tx.upsert_product(Product::new(sku.as_str(), name, price, merchant_id)?)?,
            };
            product.ensure_owned_by(merchant_id)?;
            product.add_stock(quantity)?;

            if tx.update_product(&mut product)? == 0 {
                return Err(ServiceError::conflict(format!(
                    "product {} changed during restock",
                    product.sku()
                )));
            }
            Ok::<_, ServiceError>(product)
        })?;

        info!(
            merchant = merchant_name,
            sku = product.sku(),
            added = %quantity,
            stock = %product.stock_quantity(),
            "stock updated"
        );
        Ok(product)
    }
}
