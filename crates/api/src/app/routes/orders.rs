use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use tradeflow_core::OrderId;

use crate::app::{dto, errors, services::AppServices};

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::PlaceOrderRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.place_order(body.username, body.sku, body.quantity).await {
        Ok(order) => (StatusCode::CREATED, Json(dto::OrderResponse::from(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::service_error_to_response(tradeflow_infra::ServiceError::Domain(e)),
    };

    match services.find_order(id).await {
        Ok(order) => Json(dto::OrderResponse::from(&order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Activity as seen by the event projection; lags the order itself.
pub async fn get_order_activity(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::service_error_to_response(tradeflow_infra::ServiceError::Domain(e)),
    };

    match services.order_activity(id) {
        Some(activity) => Json(activity).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "order_activity_not_found", format!("no activity for order {id}")),
    }
}
