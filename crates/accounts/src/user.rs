use serde::{Deserialize, Serialize};

use tradeflow_core::{
    AggregateRoot, DomainError, DomainResult, Money, Persisted, UserAccountId, natural_key,
};

/// Aggregate root: a buyer's wallet.
///
/// Invariant: `balance >= 0` after every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    id: Option<UserAccountId>,
    username: String,
    balance: Money,
    version: u64,
}

impl UserAccount {
    /// A new, not-yet-persisted account with a zero balance.
    pub fn new(username: impl Into<String>) -> DomainResult<Self> {
        Ok(Self {
            id: None,
            username: natural_key(username.into(), "username")?,
            balance: Money::zero(),
            version: 0,
        })
    }

    /// Rebuild an account from a stored row.
    pub fn restore(id: UserAccountId, username: String, balance: Money, version: u64) -> Self {
        Self {
            id: Some(id),
            username,
            balance,
            version,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn deposit(&mut self, amount: Money) -> DomainResult<()> {
        let amount = amount.ensure_positive("deposit amount")?;
        self.balance = self.balance.add(amount)?;
        Ok(())
    }

    pub fn withdraw(&mut self, amount: Money) -> DomainResult<()> {
        let amount = amount.ensure_positive("withdrawal amount")?;
        if self.balance.is_less_than(&amount) {
            return Err(DomainError::InsufficientBalance {
                required: amount,
                available: self.balance,
            });
        }
        self.balance = self.balance.subtract(amount)?;
        Ok(())
    }
}

impl AggregateRoot for UserAccount {
    type Id = UserAccountId;

    fn id(&self) -> Option<Self::Id> {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Persisted for UserAccount {
    fn mark_inserted(&mut self, id: Self::Id) {
        self.id = Some(id);
        self.version = 0;
    }

    fn mark_updated(&mut self) {
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn account_with(cents: i64) -> UserAccount {
        let mut user = UserAccount::new("alice").unwrap();
        if cents > 0 {
            user.deposit(Money::from_cents(cents)).unwrap();
        }
        user
    }

    #[test]
    fn new_account_starts_empty_and_unpersisted() {
        let user = UserAccount::new("  alice ").unwrap();
        assert_eq!(user.username(), "alice");
        assert!(user.balance().is_zero());
        assert_eq!(user.id(), None);
        assert_eq!(user.version(), 0);
    }

    #[test]
    fn rejects_blank_username() {
        assert!(matches!(UserAccount::new("   "), Err(DomainError::Validation(_))));
    }

    #[test]
    fn deposit_requires_positive_amount() {
        let mut user = account_with(0);
        assert!(matches!(user.deposit(Money::zero()), Err(DomainError::InvalidAmount(_))));
        assert!(matches!(user.deposit(Money::from_cents(-100)), Err(DomainError::InvalidAmount(_))));
        assert!(user.balance().is_zero());
    }

    #[test]
    fn withdraw_rejects_overdraft_without_mutation() {
        let mut user = account_with(500);
        let err = user.withdraw(Money::from_cents(1000)).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientBalance {
                required: Money::from_cents(1000),
                available: Money::from_cents(500),
            }
        );
        assert_eq!(user.balance(), Money::from_cents(500));
    }

    #[test]
    fn withdraw_can_empty_the_account() {
        let mut user = account_with(500);
        user.withdraw(Money::from_cents(500)).unwrap();
        assert!(user.balance().is_zero());
    }

    #[test]
    fn persistence_hooks_track_id_and_version() {
        let mut user = account_with(0);
        user.mark_inserted(UserAccountId::new(9));
        user.mark_updated();
        user.mark_updated();
        assert_eq!(user.id(), Some(UserAccountId::new(9)));
        assert_eq!(user.version(), 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn balance_never_goes_negative(ops in prop::collection::vec((any::<bool>(), 1i64..10_000), 0..40)) {
            let mut user = account_with(0);
            for (is_deposit, cents) in ops {
                let amount = Money::from_cents(cents);
                let _ = if is_deposit { user.deposit(amount) } else { user.withdraw(amount) };
                prop_assert!(!user.balance().is_negative());
            }
        }
    }
}
