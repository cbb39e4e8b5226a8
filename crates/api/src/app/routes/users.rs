use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use tradeflow_core::DomainError;

use crate::app::{dto, errors, services::AppServices};

pub async fn deposit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(username): Path<String>,
    body: Result<Json<dto::DepositRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let Some(amount) = body.amount else {
        return errors::service_error_to_response(DomainError::invalid_amount("amount is required").into());
    };

    match services.deposit(username, amount).await {
        Ok(user) => (StatusCode::OK, Json(dto::UserResponse::from(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(username): Path<String>,
) -> axum::response::Response {
    match services.find_user(username).await {
        Ok(user) => Json(dto::UserResponse::from(&user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
