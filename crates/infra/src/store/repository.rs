//! Per-aggregate repository contracts.
//!
//! Conventions shared by every repository:
//! - `insert_*` assigns the id and resets the version to 0 on the passed aggregate;
//! - `update_*` writes only if the stored version equals the aggregate's version,
//!   returns the affected row count, and bumps the aggregate's version on success;
//! - `list_*` returns rows in id (insertion) order;
//! - `upsert_*` returns the stored row for the candidate's natural key, inserting
//!   the candidate first if there is none.

use tradeflow_accounts::{MerchantAccount, UserAccount};
use tradeflow_core::{MerchantId, OrderId, ProductId, UserAccountId};
use tradeflow_orders::Order;
use tradeflow_products::Product;

use super::StoreError;

pub trait UserAccountRepository {
    fn find_user_by_username(&mut self, username: &str) -> Result<Option<UserAccount>, StoreError>;

    fn find_user_by_id(&mut self, id: UserAccountId) -> Result<Option<UserAccount>, StoreError>;

    fn insert_user(&mut self, user: &mut UserAccount) -> Result<(), StoreError>;

    fn update_user(&mut self, user: &mut UserAccount) -> Result<u64, StoreError>;

    fn list_users(&mut self) -> Result<Vec<UserAccount>, StoreError>;

    fn upsert_user(&mut self, candidate: UserAccount) -> Result<UserAccount, StoreError>;
}

pub trait MerchantAccountRepository {
    fn find_merchant_by_name(&mut self, name: &str) -> Result<Option<MerchantAccount>, StoreError>;

    fn find_merchant_by_id(&mut self, id: MerchantId) -> Result<Option<MerchantAccount>, StoreError>;

    fn insert_merchant(&mut self, merchant: &mut MerchantAccount) -> Result<(), StoreError>;

    fn update_merchant(&mut self, merchant: &mut MerchantAccount) -> Result<u64, StoreError>;

    fn list_merchants(&mut self) -> Result<Vec<MerchantAccount>, StoreError>;

    fn upsert_merchant(&mut self, candidate: MerchantAccount) -> Result<MerchantAccount, StoreError>;
}

pub trait ProductRepository {
    fn find_product_by_sku(&mut self, sku: &str) -> Result<Option<Product>, StoreError>;

    fn find_product_by_id(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    fn insert_product(&mut self, product: &mut Product) -> Result<(), StoreError>;

    fn update_product(&mut self, product: &mut Product) -> Result<u64, StoreError>;

    fn list_products(&mut self) -> Result<Vec<Product>, StoreError>;

    fn upsert_product(&mut self, candidate: Product) -> Result<Product, StoreError>;
}

/// Orders have no natural key, hence no upsert.
pub trait OrderRepository {
    fn find_order_by_id(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    fn insert_order(&mut self, order: &mut Order) -> Result<(), StoreError>;

    fn update_order(&mut self, order: &mut Order) -> Result<u64, StoreError>;

    fn list_orders(&mut self) -> Result<Vec<Order>, StoreError>;
}
