use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_accounts::UserAccount;
use tradeflow_core::{AggregateRoot, MerchantId, Money, OrderId, ProductId, UserAccountId};
use tradeflow_orders::{Order, OrderStatus};
use tradeflow_products::Product;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    #[serde(default)]
    pub name: String,
    pub price: Option<Decimal>,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub username: String,
    pub sku: String,
    pub quantity: i64,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Option<UserAccountId>,
    pub username: String,
    pub balance: Money,
}

impl From<&UserAccount> for UserResponse {
    fn from(user: &UserAccount) -> Self {
        Self {
            id: user.id(),
            username: user.username().to_string(),
            balance: user.balance(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Option<ProductId>,
    pub sku: String,
    pub name: String,
    pub price: Money,
    pub merchant_id: MerchantId,
    pub stock_quantity: u64,
    pub sold_quantity: u64,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id(),
            sku: product.sku().to_string(),
            name: product.name().to_string(),
            price: product.price(),
            merchant_id: product.merchant_id(),
            stock_quantity: product.stock_quantity().value(),
            sold_quantity: product.sold_quantity().value(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Option<OrderId>,
    pub user_id: UserAccountId,
    pub merchant_id: MerchantId,
    pub product_id: ProductId,
    pub quantity: u64,
    pub unit_price: Money,
    pub total_price: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            user_id: order.user_id(),
            merchant_id: order.merchant_id(),
            product_id: order.product_id(),
            quantity: order.quantity().value(),
            unit_price: order.unit_price(),
            total_price: order.total_price(),
            status: order.status(),
            created_at: order.created_at(),
        }
    }
}
