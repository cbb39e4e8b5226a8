//! In-memory state store with snapshot isolation.
//!
//! Each transaction reads from the snapshot taken at `begin` and stages its
//! writes locally. Commit re-validates every staged row against the live
//! tables (first committer wins) and publishes a new snapshot atomically.
//! Intended for tests/dev. Not optimized for large data sets.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use tradeflow_accounts::{MerchantAccount, UserAccount};
use tradeflow_core::{
    AggregateRoot, ExpectedVersion, MerchantId, OrderId, Persisted, ProductId, RowId, UserAccountId,
};
use tradeflow_orders::Order;
use tradeflow_products::Product;

use super::repository::{
    MerchantAccountRepository, OrderRepository, ProductRepository, UserAccountRepository,
};
use super::{Store, StoreError, StoreTransaction, TxMode};

/// Storage-facing view of an aggregate.
trait Row: Persisted + Clone {
    const TABLE: &'static str;

    /// Unique natural key, if the table has one.
    fn natural_key(&self) -> Option<&str> {
        None
    }
}

impl Row for UserAccount {
    const TABLE: &'static str = "user_accounts";

    fn natural_key(&self) -> Option<&str> {
        Some(self.username())
    }
}

impl Row for MerchantAccount {
    const TABLE: &'static str = "merchant_accounts";

    fn natural_key(&self) -> Option<&str> {
        Some(self.name())
    }
}

impl Row for Product {
    const TABLE: &'static str = "products";

    fn natural_key(&self) -> Option<&str> {
        Some(self.sku())
    }
}

impl Row for Order {
    const TABLE: &'static str = "orders";
}

#[derive(Debug, Clone)]
struct Table<A> {
    rows: BTreeMap<i64, A>,
}

impl<A> Default for Table<A> {
    fn default() -> Self {
        Self { rows: BTreeMap::new() }
    }
}

impl<A: Row> Table<A> {
    fn find_by_key(&self, key: &str) -> Option<&A> {
        self.rows.values().find(|row| row.natural_key() == Some(key))
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Table<UserAccount>,
    merchants: Table<MerchantAccount>,
    products: Table<Product>,
    orders: Table<Order>,
}

#[derive(Debug, Clone)]
enum Staged<A> {
    Inserted(A),
    /// `base_version` is the committed version the write was based on.
    Updated { row: A, base_version: u64 },
}

impl<A> Staged<A> {
    fn row(&self) -> &A {
        match self {
            Staged::Inserted(row) | Staged::Updated { row, .. } => row,
        }
    }

    fn into_row(self) -> A {
        match self {
            Staged::Inserted(row) | Staged::Updated { row, .. } => row,
        }
    }
}

/// Writes staged by one transaction against one table.
#[derive(Debug)]
struct Overlay<A> {
    staged: BTreeMap<i64, Staged<A>>,
}

impl<A> Default for Overlay<A> {
    fn default() -> Self {
        Self { staged: BTreeMap::new() }
    }
}

impl<A: Row> Overlay<A> {
    fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    fn get(&self, base: &Table<A>, id: i64) -> Option<A> {
        match self.staged.get(&id) {
            Some(staged) => Some(staged.row().clone()),
            None => base.rows.get(&id).cloned(),
        }
    }

    // Natural keys never change, so a staged row shadows its base row.
    fn find_by_key(&self, base: &Table<A>, key: &str) -> Option<A> {
        self.staged
            .values()
            .map(Staged::row)
            .find(|row| row.natural_key() == Some(key))
            .or_else(|| base.find_by_key(key))
            .cloned()
    }

    fn list(&self, base: &Table<A>) -> Vec<A> {
        let mut merged = base.rows.clone();
        for (id, staged) in &self.staged {
            merged.insert(*id, staged.row().clone());
        }
        merged.into_values().collect()
    }

    fn insert(&mut self, base: &Table<A>, id: i64, row: &mut A) -> Result<(), StoreError> {
        if let Some(key) = row.natural_key() {
            if self.find_by_key(base, key).is_some() {
                return Err(StoreError::conflict(format!("duplicate key {key:?} in {}", A::TABLE)));
            }
        }
        row.mark_inserted(<A::Id as RowId>::from_raw(id));
        self.staged.insert(id, Staged::Inserted(row.clone()));
        Ok(())
    }

    fn update(&mut self, base: &Table<A>, row: &mut A) -> Result<u64, StoreError> {
        let Some(id) = row.id() else {
            return Err(StoreError::integrity(format!("cannot update an unsaved {} row", A::TABLE)));
        };
        let id = id.get();
        let Some(current) = self.get(base, id) else {
            return Ok(0);
        };
        if !ExpectedVersion::of(row).matches(current.version()) {
            return Ok(0);
        }

        row.mark_updated();
        let staged = match self.staged.remove(&id) {
            Some(Staged::Inserted(_)) => Staged::Inserted(row.clone()),
            Some(Staged::Updated { base_version, .. }) => Staged::Updated {
                row: row.clone(),
                base_version,
            },
            None => Staged::Updated {
                row: row.clone(),
                base_version: current.version(),
            },
        };
        self.staged.insert(id, staged);
        Ok(1)
    }

    fn validate(&self, live: &Table<A>) -> Result<(), StoreError> {
        for (id, staged) in &self.staged {
            match staged {
                Staged::Inserted(row) => {
                    if let Some(key) = row.natural_key() {
                        if live.find_by_key(key).is_some() {
                            return Err(StoreError::conflict(format!(
                                "{key:?} was inserted into {} concurrently",
                                A::TABLE
                            )));
                        }
                    }
                }
                Staged::Updated { base_version, .. } => match live.rows.get(id) {
                    Some(committed) if committed.version() == *base_version => {}
                    _ => {
                        return Err(StoreError::conflict(format!(
                            "{} row {id} was modified concurrently",
                            A::TABLE
                        )));
                    }
                },
            }
        }
        Ok(())
    }

    fn apply(self, live: &mut Table<A>) {
        for (id, staged) in self.staged {
            live.rows.insert(id, staged.into_row());
        }
    }
}

/// In-memory implementation of [`Store`].
#[derive(Debug)]
pub struct InMemoryStore {
    live: RwLock<Arc<Tables>>,
    user_seq: AtomicI64,
    merchant_seq: AtomicI64,
    product_seq: AtomicI64,
    order_seq: AtomicI64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            live: RwLock::new(Arc::new(Tables::default())),
            user_seq: AtomicI64::new(1),
            merchant_seq: AtomicI64::new(1),
            product_seq: AtomicI64::new(1),
            order_seq: AtomicI64::new(1),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Result<Arc<Tables>, StoreError> {
        self.live
            .read()
            .map(|tables| Arc::clone(&tables))
            .map_err(|_| StoreError::backend("in-memory store lock poisoned"))
    }
}

fn next_id(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::Relaxed)
}

impl Store for InMemoryStore {
    type Tx<'a>
        = InMemoryTx<'a>
    where
        Self: 'a;

    fn begin(&self, mode: TxMode) -> Result<Self::Tx<'_>, StoreError> {
        Ok(InMemoryTx {
            store: self,
            mode,
            snapshot: self.snapshot()?,
            users: Overlay::default(),
            merchants: Overlay::default(),
            products: Overlay::default(),
            orders: Overlay::default(),
        })
    }
}

/// Transaction over an [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemoryTx<'a> {
    store: &'a InMemoryStore,
    mode: TxMode,
    snapshot: Arc<Tables>,
    users: Overlay<UserAccount>,
    merchants: Overlay<MerchantAccount>,
    products: Overlay<Product>,
    orders: Overlay<Order>,
}

impl InMemoryTx<'_> {
    fn ensure_writable(&self, operation: &str) -> Result<(), StoreError> {
        match self.mode {
            TxMode::ReadWrite => Ok(()),
            TxMode::ReadOnly => Err(StoreError::ReadOnly(operation.to_string())),
        }
    }

    fn is_clean(&self) -> bool {
        self.users.is_empty() && self.merchants.is_empty() && self.products.is_empty() && self.orders.is_empty()
    }
}

impl StoreTransaction for InMemoryTx<'_> {
    fn mode(&self) -> TxMode {
        self.mode
    }

    fn commit(self) -> Result<(), StoreError> {
        if self.is_clean() {
            return Ok(());
        }

        let mut live = self
            .store
            .live
            .write()
            .map_err(|_| StoreError::backend("in-memory store lock poisoned"))?;

        self.users.validate(&live.users)?;
        self.merchants.validate(&live.merchants)?;
        self.products.validate(&live.products)?;
        self.orders.validate(&live.orders)?;

        let mut next = Tables::clone(&live);
        self.users.apply(&mut next.users);
        self.merchants.apply(&mut next.merchants);
        self.products.apply(&mut next.products);
        self.orders.apply(&mut next.orders);
        *live = Arc::new(next);

        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl UserAccountRepository for InMemoryTx<'_> {
    fn find_user_by_username(&mut self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.users.find_by_key(&self.snapshot.users, username))
    }

    fn find_user_by_id(&mut self, id: UserAccountId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.users.get(&self.snapshot.users, id.get()))
    }

    fn insert_user(&mut self, user: &mut UserAccount) -> Result<(), StoreError> {
        self.ensure_writable("insert_user")?;
        let id = next_id(&self.store.user_seq);
        self.users.insert(&self.snapshot.users, id, user)
    }

    fn update_user(&mut self, user: &mut UserAccount) -> Result<u64, StoreError> {
        self.ensure_writable("update_user")?;
        self.users.update(&self.snapshot.users, user)
    }

    fn list_users(&mut self) -> Result<Vec<UserAccount>, StoreError> {
        Ok(self.users.list(&self.snapshot.users))
    }

    fn upsert_user(&mut self, mut candidate: UserAccount) -> Result<UserAccount, StoreError> {
        if let Some(existing) = self.find_user_by_username(candidate.username())? {
            return Ok(existing);
        }
        self.insert_user(&mut candidate)?;
        Ok(candidate)
    }
}

impl MerchantAccountRepository for InMemoryTx<'_> {
    fn find_merchant_by_name(&mut self, name: &str) -> Result<Option<MerchantAccount>, StoreError> {
        Ok(self.merchants.find_by_key(&self.snapshot.merchants, name))
    }

    fn find_merchant_by_id(&mut self, id: MerchantId) -> Result<Option<MerchantAccount>, StoreError> {
        Ok(self.merchants.get(&self.snapshot.merchants, id.get()))
    }

    fn insert_merchant(&mut self, merchant: &mut MerchantAccount) -> Result<(), StoreError> {
        self.ensure_writable("insert_merchant")?;
        let id = next_id(&self.store.merchant_seq);
        self.merchants.insert(&self.snapshot.merchants, id, merchant)
    }

    fn update_merchant(&mut self, merchant: &mut MerchantAccount) -> Result<u64, StoreError> {
        self.ensure_writable("update_merchant")?;
        self.merchants.update(&self.snapshot.merchants, merchant)
    }

    fn list_merchants(&mut self) -> Result<Vec<MerchantAccount>, StoreError> {
        Ok(self.merchants.list(&self.snapshot.merchants))
    }

    fn upsert_merchant(&mut self, mut candidate: MerchantAccount) -> Result<MerchantAccount, StoreError> {
        if let Some(existing) = self.find_merchant_by_name(candidate.name())? {
            return Ok(existing);
        }
        self.insert_merchant(&mut candidate)?;
        Ok(candidate)
    }
}

impl ProductRepository for InMemoryTx<'_> {
    fn find_product_by_sku(&mut self, sku: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.products.find_by_key(&self.snapshot.products, sku))
    }

    fn find_product_by_id(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.products.get(&self.snapshot.products, id.get()))
    }

    fn insert_product(&mut self, product: &mut Product) -> Result<(), StoreError> {
        self.ensure_writable("insert_product")?;
        if self.merchants.get(&self.snapshot.merchants, product.merchant_id().get()).is_none() {
            return Err(StoreError::integrity(format!(
                "product {} references unknown merchant {}",
                product.sku(),
                product.merchant_id()
            )));
        }
        let id = next_id(&self.store.product_seq);
        self.products.insert(&self.snapshot.products, id, product)
    }

    fn update_product(&mut self, product: &mut Product) -> Result<u64, StoreError> {
        self.ensure_writable("update_product")?;
        self.products.update(&self.snapshot.products, product)
    }

    fn list_products(&mut self) -> Result<Vec<Product>, StoreError> {
        Ok(self.products.list(&self.snapshot.products))
    }

    fn upsert_product(&mut self, mut candidate: Product) -> Result<Product, StoreError> {
        if let Some(existing) = self.find_product_by_sku(candidate.sku())? {
            return Ok(existing);
        }
        self.insert_product(&mut candidate)?;
        Ok(candidate)
    }
}

impl OrderRepository for InMemoryTx<'_> {
    fn find_order_by_id(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&self.snapshot.orders, id.get()))
    }

    fn insert_order(&mut self, order: &mut Order) -> Result<(), StoreError> {
        self.ensure_writable("insert_order")?;
        let id = next_id(&self.store.order_seq);
        self.orders.insert(&self.snapshot.orders, id, order)
    }

    fn update_order(&mut self, order: &mut Order) -> Result<u64, StoreError> {
        self.ensure_writable("update_order")?;
        self.orders.update(&self.snapshot.orders, order)
    }

    fn list_orders(&mut self) -> Result<Vec<Order>, StoreError> {
        Ok(self.orders.list(&self.snapshot.orders))
    }
}
