use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};

use tradeflow_accounts::UserAccount;
use tradeflow_core::{Money, natural_key};

use crate::store::{Store, TxMode, UserAccountRepository, with_transaction};

use super::{ServiceError, ServiceResult};

/// User funding and lookup.
#[derive(Debug)]
pub struct AccountService<S> {
    store: Arc<S>,
}

impl<S> Clone for AccountService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> AccountService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Credit `amount` to `username`, creating the account on first deposit.
    #[instrument(skip(self), err)]
    pub fn deposit(&self, username: &str, amount: Decimal) -> ServiceResult<UserAccount> {
        let amount = Money::new(amount)?.ensure_positive("deposit amount")?;
        let candidate = UserAccount::new(username)?;

        let user = with_transaction(&*self.store, TxMode::ReadWrite, |tx| {
            let mut user = tx.upsert_user(candidate)?;
            user.deposit(amount)?;
            if tx.update_user(&mut user)? == 0 {
                return Err(ServiceError::conflict(format!(
                    "user {} changed during deposit",
                    user.username()
                )));
            }
            Ok::<_, ServiceError>(user)
        })?;

        info!(username = user.username(), %amount, balance = %user.balance(), "deposit applied");
        Ok(user)
    }

    pub fn find_user(&self, username: &str) -> ServiceResult<UserAccount> {
        let username = natural_key(username, "username")?;
        with_transaction(&*self.store, TxMode::ReadOnly, |tx| {
            tx.find_user_by_username(&username)?
                .ok_or_else(|| ServiceError::UserNotFound(username.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use rust_decimal_macros::dec;
    use tradeflow_core::{AggregateRoot, DomainError};

    fn service() -> AccountService<InMemoryStore> {
        AccountService::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn first_deposit_creates_the_account() {
        let svc = service();
        let user = svc.deposit("u1", dec!(100)).unwrap();
        assert_eq!(user.balance(), Money::from_cents(10_000));
        assert_eq!(svc.find_user("u1").unwrap(), user);
    }

    #[test]
    fn deposits_accumulate_and_round_half_up() {
        let svc = service();
        svc.deposit("u1", dec!(10.005)).unwrap();
        let user = svc.deposit("u1", dec!(0.50)).unwrap();
        assert_eq!(user.balance(), Money::from_cents(1051));
    }

    #[test]
    fn non_positive_amounts_are_rejected_without_creating_the_user() {
        let svc = service();
        for amount in [dec!(0), dec!(-5)] {
            let err = svc.deposit("u1", amount).unwrap_err();
            assert!(matches!(err, ServiceError::Domain(DomainError::InvalidAmount(_))));
        }
        assert!(matches!(svc.find_user("u1"), Err(ServiceError::UserNotFound(_))));
    }

    #[test]
    fn usernames_match_regardless_of_surrounding_whitespace() {
        let svc = service();
        let user = svc.deposit(" u1 ", dec!(100)).unwrap();
        assert_eq!(user.username(), "u1");
        assert_eq!(svc.find_user(" u1 ").unwrap(), user);
        assert_eq!(svc.find_user("u1").unwrap(), user);

        let again = svc.deposit("u1\t", dec!(1)).unwrap();
        assert_eq!(again.id(), user.id());
        assert_eq!(again.balance(), Money::from_cents(10_100));
    }

    #[test]
    fn amounts_too_large_for_cents_are_invalid() {
        let svc = service();
        let err = svc.deposit("rich", Decimal::MAX).unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidAmount(_))));
        assert!(matches!(svc.find_user("rich"), Err(ServiceError::UserNotFound(_))));
    }

    #[test]
    fn blank_username_is_a_validation_error() {
        let err = service().deposit("  ", dec!(1)).unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }
}
