use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use tradeflow_core::DomainError;

use crate::app::{dto, errors, services::AppServices};

pub async fn add_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path((merchant, sku)): Path<(String, String)>,
    body: Result<Json<dto::StockRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let Some(price) = body.price else {
        return errors::service_error_to_response(DomainError::invalid_amount("price is required").into());
    };

    match services
        .add_or_update_product_stock(merchant, sku, body.name, price, body.quantity)
        .await
    {
        Ok(product) => (StatusCode::OK, Json(dto::ProductResponse::from(&product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
