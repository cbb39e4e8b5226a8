use thiserror::Error;

use tradeflow_core::{DomainError, OrderId};

use crate::locks::LockError;
use crate::store::StoreError;

/// Failure surfaced by an application service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("merchant not found: {0}")]
    MerchantNotFound(String),

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Optimistic concurrency failure (stale version, lost commit race, lock timeout).
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Stored state is inconsistent with the domain model.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error(transparent)]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by transports to pick a status.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BusinessRule,
    Concurrency,
    Integrity,
}

impl ServiceError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConcurrencyConflict(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::UserNotFound(_)
            | ServiceError::ProductNotFound(_)
            | ServiceError::OrderNotFound(_) => ErrorKind::NotFound,
            // A product whose merchant row is missing is a broken foreign key, not a bad request.
            ServiceError::MerchantNotFound(_) => ErrorKind::Integrity,
            ServiceError::Domain(DomainError::InvariantViolation(_)) => ErrorKind::Integrity,
            ServiceError::Domain(_) => ErrorKind::BusinessRule,
            ServiceError::ConcurrencyConflict(_) => ErrorKind::Concurrency,
            ServiceError::Integrity(_) | ServiceError::Store(_) | ServiceError::Internal(_) => {
                ErrorKind::Integrity
            }
        }
    }

    /// Only concurrency failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Concurrency
    }

    /// Stable snake_case code for wire responses.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::UserNotFound(_) => "user_not_found",
            ServiceError::ProductNotFound(_) => "product_not_found",
            ServiceError::MerchantNotFound(_) => "merchant_not_found",
            ServiceError::OrderNotFound(_) => "order_not_found",
            ServiceError::Domain(e) => e.code(),
            ServiceError::ConcurrencyConflict(_) => "concurrency_conflict",
            ServiceError::Integrity(_) => "integrity_violation",
            ServiceError::Store(_) => "storage_error",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => ServiceError::ConcurrencyConflict(msg),
            StoreError::Integrity(msg) => ServiceError::Integrity(msg),
            other => ServiceError::Store(other),
        }
    }
}

impl From<LockError> for ServiceError {
    fn from(value: LockError) -> Self {
        match value {
            LockError::Timeout { key } => {
                ServiceError::ConcurrencyConflict(format!("lock on {key} not acquired in time"))
            }
            LockError::Poisoned => ServiceError::Internal(value.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tradeflow_core::Money;

    #[test]
    fn kinds_follow_the_error_taxonomy() {
        assert_eq!(ServiceError::UserNotFound("u".into()).kind(), ErrorKind::NotFound);
        assert_eq!(ServiceError::OrderNotFound(OrderId::new(1)).kind(), ErrorKind::NotFound);
        assert_eq!(
            ServiceError::from(DomainError::InsufficientBalance {
                required: Money::from_cents(1000),
                available: Money::from_cents(500),
            })
            .kind(),
            ErrorKind::BusinessRule
        );
        assert_eq!(
            ServiceError::from(DomainError::invariant("x")).kind(),
            ErrorKind::Integrity
        );
        assert_eq!(ServiceError::MerchantNotFound("m".into()).kind(), ErrorKind::Integrity);
    }

    #[test]
    fn store_conflicts_become_retryable_concurrency_errors() {
        let err = ServiceError::from(StoreError::conflict("products row 1"));
        assert!(matches!(err, ServiceError::ConcurrencyConflict(_)));
        assert!(err.is_retryable());

        let err = ServiceError::from(StoreError::backend("down"));
        assert!(matches!(err, ServiceError::Store(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn lock_timeouts_are_conflicts() {
        let err = ServiceError::from(LockError::Timeout { key: "sku1".into() });
        assert_eq!(err.code(), "concurrency_conflict");
        assert!(err.is_retryable());
    }

    #[test]
    fn domain_codes_pass_through() {
        let err = ServiceError::from(DomainError::InsufficientStock { requested: 11, available: 10 });
        assert_eq!(err.code(), "insufficient_stock");
    }
}
