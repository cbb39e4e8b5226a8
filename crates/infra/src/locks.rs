//! Process-local key locks.
//!
//! Serialises work on the same key (e.g. a SKU) inside one process. This only
//! reduces contention: correctness still comes from version-checked updates,
//! and other processes sharing the database are not covered.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("timed out waiting for lock on {key}")]
    Timeout { key: String },

    #[error("key lock table poisoned")]
    Poisoned,
}

/// A set of named mutexes created on demand.
#[derive(Debug, Default)]
pub struct KeyLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `key` is free or `timeout` elapses.
    pub fn acquire(&self, key: &str, timeout: Duration) -> Result<KeyLockGuard<'_>, LockError> {
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock().map_err(|_| LockError::Poisoned)?;

        while held.contains(key) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(key, "key lock timed out");
                return Err(LockError::Timeout { key: key.to_string() });
            }
            let (next, _) = self
                .released
                .wait_timeout(held, remaining)
                .map_err(|_| LockError::Poisoned)?;
            held = next;
        }

        held.insert(key.to_string());
        Ok(KeyLockGuard {
            locks: self,
            key: key.to_string(),
        })
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().map(|held| held.contains(key)).unwrap_or(false)
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct KeyLockGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
}

impl Drop for KeyLockGuard<'_> {
    fn drop(&mut self) {
        // A poisoned table still has to release the key or every waiter times out.
        let mut held = match self.locks.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(&self.key);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn guard_releases_on_drop() {
        let locks = KeyLocks::new();
        {
            let _guard = locks.acquire("sku1", Duration::from_millis(10)).unwrap();
            assert!(locks.is_held("sku1"));
        }
        assert!(!locks.is_held("sku1"));
    }

    #[test]
    fn second_acquire_times_out_while_held() {
        let locks = KeyLocks::new();
        let _guard = locks.acquire("sku1", Duration::from_millis(10)).unwrap();

        let err = locks.acquire("sku1", Duration::from_millis(20)).unwrap_err();
        assert_eq!(err, LockError::Timeout { key: "sku1".into() });
    }

    #[test]
    fn distinct_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _a = locks.acquire("sku1", Duration::from_millis(10)).unwrap();
        let _b = locks.acquire("sku2", Duration::from_millis(10)).unwrap();
    }

    #[test]
    fn waiters_are_serialised() {
        let locks = Arc::new(KeyLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    let _guard = locks.acquire("sku1", Duration::from_secs(5)).unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
