//! Read models built from published events.
//!
//! Projections are idempotent: safe for at-least-once delivery.

pub mod order_activity;

pub use order_activity::{OrderActivity, OrderActivityProjection, ProjectionError};
