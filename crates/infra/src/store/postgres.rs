//! Postgres-backed state store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (serialization failure) | `40001` | `Conflict` |
//! | Database (foreign key / check violation) | `23503` / `23514` | `Integrity` |
//! | Database (read-only transaction) | `25006` | `ReadOnly` |
//! | Column decode / not found | N/A | `Integrity` |
//! | Anything else | N/A | `Backend` |
//!
//! ## Sync bridge
//!
//! The repository traits are synchronous. Each call runs the sqlx future on the
//! runtime handle captured at construction, so callers must be on a thread the
//! runtime does not drive (e.g. `spawn_blocking` or a plain worker thread).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Postgres, Row, Transaction};
use tokio::runtime::Handle;
use tracing::{debug, instrument};

use tradeflow_accounts::{MerchantAccount, UserAccount};
use tradeflow_core::{
    AggregateRoot, MerchantId, Money, OrderId, Persisted, ProductId, Quantity, RowId, UserAccountId,
};
use tradeflow_orders::{Order, OrderStatus};
use tradeflow_products::Product;

use super::repository::{
    MerchantAccountRepository, OrderRepository, ProductRepository, UserAccountRepository,
};
use super::{Store, StoreError, StoreTransaction, TxMode};

/// Idempotent DDL for the four aggregate tables.
pub const SCHEMA: &str = include_str!("schema.sql");

/// Postgres implementation of [`Store`].
///
/// Read-write transactions run at READ COMMITTED: every update is guarded by
/// `WHERE id = $1 AND version = $2`, so a concurrent writer makes the update
/// affect zero rows instead of silently overwriting. Read-only transactions run
/// at REPEATABLE READ so a settlement pass sees one consistent snapshot.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    handle: Handle,
}

impl PostgresStore {
    pub fn new(pool: PgPool, handle: Handle) -> Self {
        Self { pool, handle }
    }

    /// Connect a pool; the current runtime handle is captured for the sync bridge.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool, Handle::current()))
    }

    /// Apply [`SCHEMA`].
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        debug!("schema applied");
        Ok(())
    }
}

impl Store for PostgresStore {
    type Tx<'a>
        = PostgresTx
    where
        Self: 'a;

    #[instrument(skip(self), level = "debug", err)]
    fn begin(&self, mode: TxMode) -> Result<PostgresTx, StoreError> {
        let tx = self
            .handle
            .block_on(async {
                let mut tx = self.pool.begin().await?;
                if mode == TxMode::ReadOnly {
                    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                        .execute(&mut *tx)
                        .await?;
                }
                Ok::<_, sqlx::Error>(tx)
            })
            .map_err(|e| map_sqlx_error("begin", e))?;

        Ok(PostgresTx {
            tx,
            handle: self.handle.clone(),
            mode,
        })
    }
}

/// Transaction over a [`PostgresStore`]. Dropping it rolls back.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
    handle: Handle,
    mode: TxMode,
}

impl core::fmt::Debug for PostgresTx {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostgresTx").field("mode", &self.mode).finish_non_exhaustive()
    }
}

impl PostgresTx {
    fn ensure_writable(&self, operation: &str) -> Result<(), StoreError> {
        match self.mode {
            TxMode::ReadWrite => Ok(()),
            TxMode::ReadOnly => Err(StoreError::ReadOnly(operation.to_string())),
        }
    }
}

impl StoreTransaction for PostgresTx {
    fn mode(&self) -> TxMode {
        self.mode
    }

    fn commit(self) -> Result<(), StoreError> {
        let PostgresTx { tx, handle, .. } = self;
        handle.block_on(tx.commit()).map_err(|e| map_sqlx_error("commit", e))
    }

    fn rollback(self) -> Result<(), StoreError> {
        let PostgresTx { tx, handle, .. } = self;
        handle.block_on(tx.rollback()).map_err(|e| map_sqlx_error("rollback", e))
    }
}

// ---------------------------------------------------------------------------
// user_accounts

const USER_COLUMNS: &str = "id, username, balance, version";

impl UserAccountRepository for PostgresTx {
    fn find_user_by_username(&mut self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM user_accounts WHERE username = $1");
        let row = self
            .handle
            .block_on(sqlx::query(&sql).bind(username).fetch_optional(&mut *self.tx))
            .map_err(|e| map_sqlx_error("find_user_by_username", e))?;
        row.map(|r| decode::<UserRow>(&r)?.try_into()).transpose()
    }

    fn find_user_by_id(&mut self, id: UserAccountId) -> Result<Option<UserAccount>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM user_accounts WHERE id = $1");
        let row = self
            .handle
            .block_on(sqlx::query(&sql).bind(id.get()).fetch_optional(&mut *self.tx))
            .map_err(|e| map_sqlx_error("find_user_by_id", e))?;
        row.map(|r| decode::<UserRow>(&r)?.try_into()).transpose()
    }

    fn insert_user(&mut self, user: &mut UserAccount) -> Result<(), StoreError> {
        self.ensure_writable("insert_user")?;
        let id: i64 = self
            .handle
            .block_on(
                sqlx::query_scalar(
                    "INSERT INTO user_accounts (username, balance, version) VALUES ($1, $2, 0) RETURNING id",
                )
                .bind(user.username())
                .bind(user.balance().amount())
                .fetch_one(&mut *self.tx),
            )
            .map_err(|e| map_sqlx_error("insert_user", e))?;
        user.mark_inserted(UserAccountId::new(id));
        Ok(())
    }

    fn update_user(&mut self, user: &mut UserAccount) -> Result<u64, StoreError> {
        self.ensure_writable("update_user")?;
        let id = persisted_id(user, "user_accounts")?;
        let affected = self
            .handle
            .block_on(
                sqlx::query(
                    "UPDATE user_accounts SET balance = $1, version = version + 1 WHERE id = $2 AND version = $3",
                )
                .bind(user.balance().amount())
                .bind(id)
                .bind(version_column(user.version())?)
                .execute(&mut *self.tx),
            )
            .map_err(|e| map_sqlx_error("update_user", e))?
            .rows_affected();
        if affected == 1 {
            user.mark_updated();
        }
        Ok(affected)
    }

    fn list_users(&mut self) -> Result<Vec<UserAccount>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM user_accounts ORDER BY id");
        let rows = self
            .handle
            .block_on(sqlx::query(&sql).fetch_all(&mut *self.tx))
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(|r| decode::<UserRow>(r)?.try_into()).collect()
    }

    fn upsert_user(&mut self, candidate: UserAccount) -> Result<UserAccount, StoreError> {
        if let Some(existing) = self.find_user_by_username(candidate.username())? {
            return Ok(existing);
        }
        self.ensure_writable("upsert_user")?;
        self.handle
            .block_on(
                sqlx::query(
                    "INSERT INTO user_accounts (username, balance, version) VALUES ($1, $2, 0) ON CONFLICT (username) DO NOTHING",
                )
                .bind(candidate.username())
                .bind(candidate.balance().amount())
                .execute(&mut *self.tx),
            )
            .map_err(|e| map_sqlx_error("upsert_user", e))?;
        self.find_user_by_username(candidate.username())?
            .ok_or_else(|| StoreError::integrity(format!("user {:?} vanished after upsert", candidate.username())))
    }
}

// ---------------------------------------------------------------------------
// merchant_accounts

const MERCHANT_COLUMNS: &str = "id, name, balance, version";

impl MerchantAccountRepository for PostgresTx {
    fn find_merchant_by_name(&mut self, name: &str) -> Result<Option<MerchantAccount>, StoreError> {
        let sql = format!("SELECT {MERCHANT_COLUMNS} FROM merchant_accounts WHERE name = $1");
        let row = self
            .handle
            .block_on(sqlx::query(&sql).bind(name).fetch_optional(&mut *self.tx))
            .map_err(|e| map_sqlx_error("find_merchant_by_name", e))?;
        row.map(|r| decode::<MerchantRow>(&r)?.try_into()).transpose()
    }

    fn find_merchant_by_id(&mut self, id: MerchantId) -> Result<Option<MerchantAccount>, StoreError> {
        let sql = format!("SELECT {MERCHANT_COLUMNS} FROM merchant_accounts WHERE id = $1");
        let row = self
            .handle
            .block_on(sqlx::query(&sql).bind(id.get()).fetch_optional(&mut *self.tx))
            .map_err(|e| map_sqlx_error("find_merchant_by_id", e))?;
        row.map(|r| decode::<MerchantRow>(&r)?.try_into()).transpose()
    }

    fn insert_merchant(&mut self, merchant: &mut MerchantAccount) -> Result<(), StoreError> {
        self.ensure_writable("insert_merchant")?;
        let id: i64 = self
            .handle
            .block_on(
                sqlx::query_scalar(
                    "INSERT INTO merchant_accounts (name, balance, version) VALUES ($1, $2, 0) RETURNING id",
                )
                .bind(merchant.name())
                .bind(merchant.balance().amount())
                .fetch_one(&mut *self.tx),
            )
            .map_err(|e| map_sqlx_error("insert_merchant", e))?;
        merchant.mark_inserted(MerchantId::new(id));
        Ok(())
    }

    fn update_merchant(&mut self, merchant: &mut MerchantAccount) -> Result<u64, StoreError> {
        self.ensure_writable("update_merchant")?;
        let id = persisted_id(merchant, "merchant_accounts")?;
        let affected = self
            .handle
            .block_on(
                sqlx::query(
                    "UPDATE merchant_accounts SET balance = $1, version = version + 1 WHERE id = $2 AND version = $3",
                )
                .bind(merchant.balance().amount())
                .bind(id)
                .bind(version_column(merchant.version())?)
                .execute(&mut *self.tx),
            )
            .map_err(|e| map_sqlx_error("update_merchant", e))?
            .rows_affected();
        if affected == 1 {
            merchant.mark_updated();
        }
        Ok(affected)
    }

    fn list_merchants(&mut self) -> Result<Vec<MerchantAccount>, StoreError> {
        let sql = format!("SELECT {MERCHANT_COLUMNS} FROM merchant_accounts ORDER BY id");
        let rows = self
            .handle
            .block_on(sqlx::query(&sql).fetch_all(&mut *self.tx))
            .map_err(|e| map_sqlx_error("list_merchants", e))?;
        rows.iter().map(|r| decode::<MerchantRow>(r)?.try_into()).collect()
    }

    fn upsert_merchant(&mut self, candidate: MerchantAccount) -> Result<MerchantAccount, StoreError> {
        if let Some(existing) = self.find_merchant_by_name(candidate.name())? {
            return Ok(existing);
        }
        self.ensure_writable("upsert_merchant")?;
        self.handle
            .block_on(
                sqlx::query(
                    "INSERT INTO merchant_accounts (name, balance, version) VALUES ($1, $2, 0) ON CONFLICT (name) DO NOTHING",
                )
                .bind(candidate.name())
                .bind(candidate.balance().amount())
                .execute(&mut *self.tx),
            )
            .map_err(|e| map_sqlx_error("upsert_merchant", e))?;
        self.find_merchant_by_name(candidate.name())?
            .ok_or_else(|| StoreError::integrity(format!("merchant {:?} vanished after upsert", candidate.name())))
    }
}

// ---------------------------------------------------------------------------
// products

const PRODUCT_COLUMNS: &str =
    "id, sku, name, price, merchant_id, stock_quantity, sold_quantity, version";

impl ProductRepository for PostgresTx {
    fn find_product_by_sku(&mut self, sku: &str) -> Result<Option<Product>, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1");
        let row = self
            .handle
            .block_on(sqlx::query(&sql).bind(sku).fetch_optional(&mut *self.tx))
            .map_err(|e| map_sqlx_error("find_product_by_sku", e))?;
        row.map(|r| decode::<ProductRow>(&r)?.try_into()).transpose()
    }

    fn find_product_by_id(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = self
            .handle
            .block_on(sqlx::query(&sql).bind(id.get()).fetch_optional(&mut *self.tx))
            .map_err(|e| map_sqlx_error("find_product_by_id", e))?;
        row.map(|r| decode::<ProductRow>(&r)?.try_into()).transpose()
    }

    fn insert_product(&mut self, product: &mut Product) -> Result<(), StoreError> {
        self.ensure_writable("insert_product")?;
        let id: i64 = self
            .handle
            .block_on(
                sqlx::query_scalar(
                    r#"
                    INSERT INTO products (sku, name, price, merchant_id, stock_quantity, sold_quantity, version)
                    VALUES ($1, $2, $3, $4, $5, $6, 0)
                    RETURNING id
                    "#,
                )
                .bind(product.sku())
                .bind(product.name())
                .bind(product.price().amount())
                .bind(product.merchant_id().get())
                .bind(product.stock_quantity().as_i64())
                .bind(product.sold_quantity().as_i64())
                .fetch_one(&mut *self.tx),
            )
            .map_err(|e| map_sqlx_error("insert_product", e))?;
        product.mark_inserted(ProductId::new(id));
        Ok(())
    }

    fn update_product(&mut self, product: &mut Product) -> Result<u64, StoreError> {
        self.ensure_writable("update_product")?;
        let id = persisted_id(product, "products")?;
        let affected = self
            .handle
            .block_on(
                sqlx::query(
                    r#"
                    UPDATE products
                    SET stock_quantity = $1, sold_quantity = $2, version = version + 1
                    WHERE id = $3 AND version = $4
                    "#,
                )
                .bind(product.stock_quantity().as_i64())
                .bind(product.sold_quantity().as_i64())
                .bind(id)
                .bind(version_column(product.version())?)
                .execute(&mut *self.tx),
            )
            .map_err(|e| map_sqlx_error("update_product", e))?
            .rows_affected();
        if affected == 1 {
            product.mark_updated();
        }
        Ok(affected)
    }

    fn list_products(&mut self) -> Result<Vec<Product>, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id");
        let rows = self
            .handle
            .block_on(sqlx::query(&sql).fetch_all(&mut *self.tx))
            .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(|r| decode::<ProductRow>(r)?.try_into()).collect()
    }

    fn upsert_product(&mut self, candidate: Product) -> Result<Product, StoreError> {
        if let Some(existing) = self.find_product_by_sku(candidate.sku())? {
            return Ok(existing);
        }
        self.ensure_writable("upsert_product")?;
        self.handle
            .block_on(
                sqlx::query(
                    r#"
                    INSERT INTO products (sku, name, price, merchant_id, stock_quantity, sold_quantity, version)
                    VALUES ($1, $2, $3, $4, $5, $6, 0)
                    ON CONFLICT (sku) DO NOTHING
                    "#,
                )
                .bind(candidate.sku())
                .bind(candidate.name())
                .bind(candidate.price().amount())
                .bind(candidate.merchant_id().get())
                .bind(candidate.stock_quantity().as_i64())
                .bind(candidate.sold_quantity().as_i64())
                .execute(&mut *self.tx),
            )
            .map_err(|e| map_sqlx_error("upsert_product", e))?;
        self.find_product_by_sku(candidate.sku())?
            .ok_or_else(|| StoreError::integrity(format!("product {:?} vanished after upsert", candidate.sku())))
    }
}

// ---------------------------------------------------------------------------
// orders

const ORDER_COLUMNS: &str = "id, user_id, merchant_id, product_id, quantity, unit_price, total_price, status, created_at, version";

impl OrderRepository for PostgresTx {
    fn find_order_by_id(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = self
            .handle
            .block_on(sqlx::query(&sql).bind(id.get()).fetch_optional(&mut *self.tx))
            .map_err(|e| map_sqlx_error("find_order_by_id", e))?;
        row.map(|r| decode::<OrderRow>(&r)?.try_into()).transpose()
    }

    fn insert_order(&mut self, order: &mut Order) -> Result<(), StoreError> {
        self.ensure_writable("insert_order")?;
        let id: i64 = self
            .handle
            .block_on(
                sqlx::query_scalar(
                    r#"
                    INSERT INTO orders (user_id, merchant_id, product_id, quantity, unit_price, total_price, status, created_at, version)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0)
                    RETURNING id
                    "#,
                )
                .bind(order.user_id().get())
                .bind(order.merchant_id().get())
                .bind(order.product_id().get())
                .bind(order.quantity().as_i64())
                .bind(order.unit_price().amount())
                .bind(order.total_price().amount())
                .bind(order.status().as_str())
                .bind(order.created_at())
                .fetch_one(&mut *self.tx),
            )
            .map_err(|e| map_sqlx_error("insert_order", e))?;
        order.mark_inserted(OrderId::new(id));
        Ok(())
    }

    fn update_order(&mut self, order: &mut Order) -> Result<u64, StoreError> {
        self.ensure_writable("update_order")?;
        let id = persisted_id(order, "orders")?;
        let affected = self
            .handle
            .block_on(
                sqlx::query("UPDATE orders SET status = $1, version = version + 1 WHERE id = $2 AND version = $3")
                    .bind(order.status().as_str())
                    .bind(id)
                    .bind(version_column(order.version())?)
                    .execute(&mut *self.tx),
            )
            .map_err(|e| map_sqlx_error("update_order", e))?
            .rows_affected();
        if affected == 1 {
            order.mark_updated();
        }
        Ok(affected)
    }

    fn list_orders(&mut self) -> Result<Vec<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id");
        let rows = self
            .handle
            .block_on(sqlx::query(&sql).fetch_all(&mut *self.tx))
            .map_err(|e| map_sqlx_error("list_orders", e))?;
        rows.iter().map(|r| decode::<OrderRow>(r)?.try_into()).collect()
    }
}

// ---------------------------------------------------------------------------
// helpers

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("40001") => StoreError::Conflict(msg),
                Some("23503") | Some("23514") => StoreError::Integrity(msg),
                Some("25006") => StoreError::ReadOnly(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::backend(format!("connection pool closed in {operation}")),
        sqlx::Error::ColumnNotFound(column) => {
            StoreError::integrity(format!("column {column} missing in {operation}"))
        }
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::integrity(format!("cannot decode column {index} in {operation}: {source}"))
        }
        other => StoreError::backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn decode<'r, T: FromRow<'r, PgRow>>(row: &'r PgRow) -> Result<T, StoreError> {
    T::from_row(row).map_err(|e| map_sqlx_error("decode row", e))
}

fn persisted_id<A: AggregateRoot>(aggregate: &A, table: &str) -> Result<i64, StoreError> {
    aggregate
        .id()
        .map(RowId::get)
        .ok_or_else(|| StoreError::integrity(format!("cannot update an unsaved {table} row")))
}

fn version_column(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::integrity(format!("version {version} out of range")))
}

fn version_field(version: i64) -> Result<u64, StoreError> {
    u64::try_from(version).map_err(|_| StoreError::integrity(format!("negative version {version}")))
}

fn quantity_field(column: &str, value: i64) -> Result<Quantity, StoreError> {
    Quantity::of_non_negative(value).map_err(|e| StoreError::integrity(format!("{column}: {e}")))
}

fn money_field(column: &str, value: Decimal) -> Result<Money, StoreError> {
    Money::new(value).map_err(|e| StoreError::integrity(format!("{column}: {e}")))
}

// SQLx row types

#[derive(Debug)]
struct UserRow {
    id: i64,
    username: String,
    balance: Decimal,
    version: i64,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            balance: row.try_get("balance")?,
            version: row.try_get("version")?,
        })
    }
}

impl TryFrom<UserRow> for UserAccount {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserAccount::restore(
            UserAccountId::new(row.id),
            row.username,
            money_field("user_accounts.balance", row.balance)?,
            version_field(row.version)?,
        ))
    }
}

#[derive(Debug)]
struct MerchantRow {
    id: i64,
    name: String,
    balance: Decimal,
    version: i64,
}

impl<'r> FromRow<'r, PgRow> for MerchantRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MerchantRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            balance: row.try_get("balance")?,
            version: row.try_get("version")?,
        })
    }
}

impl TryFrom<MerchantRow> for MerchantAccount {
    type Error = StoreError;

    fn try_from(row: MerchantRow) -> Result<Self, Self::Error> {
        Ok(MerchantAccount::restore(
            MerchantId::new(row.id),
            row.name,
            money_field("merchant_accounts.balance", row.balance)?,
            version_field(row.version)?,
        ))
    }
}

#[derive(Debug)]
struct ProductRow {
    id: i64,
    sku: String,
    name: String,
    price: Decimal,
    merchant_id: i64,
    stock_quantity: i64,
    sold_quantity: i64,
    version: i64,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
            merchant_id: row.try_get("merchant_id")?,
            stock_quantity: row.try_get("stock_quantity")?,
            sold_quantity: row.try_get("sold_quantity")?,
            version: row.try_get("version")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product::restore(
            ProductId::new(row.id),
            row.sku,
            row.name,
            money_field("products.price", row.price)?,
            MerchantId::new(row.merchant_id),
            quantity_field("stock_quantity", row.stock_quantity)?,
            quantity_field("sold_quantity", row.sold_quantity)?,
            version_field(row.version)?,
        ))
    }
}

#[derive(Debug)]
struct OrderRow {
    id: i64,
    user_id: i64,
    merchant_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: Decimal,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    version: i64,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            merchant_id: row.try_get("merchant_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            total_price: row.try_get("total_price")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            version: row.try_get("version")?,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::integrity(format!("orders.status: {e}")))?;
        Ok(Order::restore(
            OrderId::new(row.id),
            UserAccountId::new(row.user_id),
            MerchantId::new(row.merchant_id),
            ProductId::new(row.product_id),
            quantity_field("quantity", row.quantity)?,
            money_field("orders.unit_price", row.unit_price)?,
            money_field("orders.total_price", row.total_price)?,
            status,
            row.created_at,
            version_field(row.version)?,
        ))
    }
}
