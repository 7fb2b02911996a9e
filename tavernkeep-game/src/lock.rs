//! Per-entity tick exclusion with auto-expiry.
//!
//! The registry is an explicit object owned by the engine, not a module
//! global. A lock left behind by a crashed caller expires on its own, so a
//! wedged invocation can never permanently stall an entity.

use log::warn;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{LOCK_RETRY_ATTEMPTS, LOCK_RETRY_DELAY_MS, LOCK_TIMEOUT_MS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("entity {0} is locked by another caller")]
    Contended(String),
}

/// Proof of a successful acquisition; release requires it back so a caller
/// whose lock was stolen after expiry cannot release the thief's hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockToken(u64);

#[derive(Debug)]
struct LockEntry {
    token: u64,
    expires_at: u64,
}

#[derive(Debug)]
pub struct LockRegistry {
    entries: Mutex<HashMap<String, LockEntry>>,
    next_token: AtomicU64,
    timeout_ms: u64,
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LockRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(LOCK_TIMEOUT_MS)
    }

    #[must_use]
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            timeout_ms,
        }
    }

    /// Attempt exclusive hold, retrying briefly before giving up. A hold
    /// whose deadline has passed is treated as abandoned and stolen.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Contended` when the entity stays held through
    /// every retry.
    pub fn acquire(&self, entity_id: &str, now: u64) -> Result<LockToken, LockError> {
        for attempt in 0..=LOCK_RETRY_ATTEMPTS {
            if let Some(token) = self.try_acquire(entity_id, now) {
                return Ok(token);
            }
            if attempt < LOCK_RETRY_ATTEMPTS {
                thread::sleep(Duration::from_millis(LOCK_RETRY_DELAY_MS));
            }
        }
        Err(LockError::Contended(entity_id.to_string()))
    }

    fn try_acquire(&self, entity_id: &str, now: u64) -> Option<LockToken> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(entity_id) {
            if entry.expires_at > now {
                return None;
            }
            warn!("stealing expired tick lock for {entity_id}");
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            entity_id.to_string(),
            LockEntry {
                token,
                expires_at: now.saturating_add(self.timeout_ms),
            },
        );
        Some(LockToken(token))
    }

    /// Idempotent release; stale tokens (expired and stolen holds) are
    /// ignored.
    pub fn release(&self, entity_id: &str, token: LockToken) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if entries.get(entity_id).is_some_and(|e| e.token == token.0) {
            entries.remove(entity_id);
        }
    }

    /// Whether the entity is held by an unexpired lock.
    #[must_use]
    pub fn is_locked(&self, entity_id: &str, now: u64) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity_id)
            .is_some_and(|e| e.expires_at > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_caller_is_rejected_while_held() {
        let locks = LockRegistry::new();
        let token = locks.acquire("inn-1", 1_000).expect("free lock");
        assert!(locks.is_locked("inn-1", 1_001));
        assert_eq!(
            locks.acquire("inn-1", 1_001),
            Err(LockError::Contended("inn-1".to_string()))
        );
        locks.release("inn-1", token);
        assert!(locks.acquire("inn-1", 1_002).is_ok());
    }

    #[test]
    fn independent_entities_do_not_contend() {
        let locks = LockRegistry::new();
        let _a = locks.acquire("inn-1", 0).expect("free lock");
        assert!(locks.acquire("inn-2", 0).is_ok());
    }

    #[test]
    fn expired_hold_is_stolen() {
        let locks = LockRegistry::with_timeout(100);
        let stale = locks.acquire("inn-1", 1_000).expect("free lock");
        // Holder crashed; a later caller takes over once the deadline passes.
        assert_eq!(
            locks.acquire("inn-1", 1_050),
            Err(LockError::Contended("inn-1".to_string()))
        );
        let fresh = locks.acquire("inn-1", 1_100).expect("expired hold");
        // The original holder's release must not free the new hold.
        locks.release("inn-1", stale);
        assert!(locks.is_locked("inn-1", 1_101));
        locks.release("inn-1", fresh);
        assert!(!locks.is_locked("inn-1", 1_101));
    }

    #[test]
    fn release_is_idempotent() {
        let locks = LockRegistry::new();
        let token = locks.acquire("inn-1", 0).expect("free lock");
        locks.release("inn-1", token);
        locks.release("inn-1", token);
        assert!(!locks.is_locked("inn-1", 1));
    }
}
