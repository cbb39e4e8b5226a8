//! Background jobs.
//!
//! - `SettlementScheduler`: daily settlement run with an on-demand trigger

pub mod settlement_scheduler;

pub use settlement_scheduler::{
    DailySchedule, LatestSettlement, SettlementScheduler, SettlementSchedulerHandle,
};
