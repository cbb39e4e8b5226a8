//! Infrastructure layer: state stores, application services, background work, config.

pub mod config;
pub mod jobs;
pub mod locks;
pub mod projections;
pub mod services;
pub mod store;
pub mod workers;

#[cfg(test)]
mod integration_tests;

pub use config::{AppConfig, ConfigError};
pub use services::{
    AccountService, ErrorKind, InventoryService, OrderPlacementFlow, OrderQueries, ServiceError,
    ServiceResult, SettlementEngine, SettlementReport, SettlementResult, TradingServices,
};
pub use store::{InMemoryStore, PostgresStore, Store, StoreError, TxMode};
