//! Accounts domain module (user wallets and merchant books).
//!
//! This crate contains the balance rules for buyers and sellers, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod merchant;
pub mod user;

pub use merchant::MerchantAccount;
pub use user::UserAccount;
