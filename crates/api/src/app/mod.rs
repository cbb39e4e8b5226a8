//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, service bundle, background workers
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use tradeflow_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, Background};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// The returned [`Background`] owns the settlement scheduler and event
/// workers; shut it down after the server stops.
pub async fn build_app(config: &AppConfig) -> anyhow::Result<(Router, Background)> {
    let (services, background) = services::build_services(config).await?;

    let router = Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(Arc::new(services)))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::log_requests)));

    Ok((router, background))
}
