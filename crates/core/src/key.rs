//! Natural keys: usernames, merchant names and SKUs.
//!
//! Keys are trimmed when an aggregate is created and again before every
//! lookup, so `" u1 "` and `"u1"` always name the same row.

use crate::error::{DomainError, DomainResult};

/// Trimmed, non-blank natural key.
pub fn natural_key(value: impl AsRef<str>, what: &str) -> DomainResult<String> {
    let trimmed = value.as_ref().trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{what} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
