use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::{errors, services::AppServices};

pub async fn run(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.run_settlement().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn latest(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.latest_settlement() {
        Some(report) => Json(report).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "settlement_not_found", "no settlement has run yet"),
    }
}
