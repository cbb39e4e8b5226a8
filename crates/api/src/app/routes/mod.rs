use axum::{
    Router,
    routing::{get, post},
};

pub mod merchants;
pub mod orders;
pub mod settlement;
pub mod system;
pub mod users;

/// Router for every business endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/users/:username", get(users::get_user))
        .route("/users/:username/deposit", post(users::deposit))
        .route("/merchants/:merchant/products/:sku/stock", post(merchants::add_stock))
        .route("/orders", post(orders::place_order))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/activity", get(orders::get_order_activity))
        .route("/settlement/run", post(settlement::run))
        .route("/settlement/latest", get(settlement::latest))
}
