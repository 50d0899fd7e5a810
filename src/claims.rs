//! Bounded memo of accepted claims.
//!
//! Entries are keyed by the `(token, nonce, mac, context)` tuple and carry
//! the token's expiry, so a cached admission never outlives the token it was granted for.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use serde::Deserialize;
use tracing::debug;

use crate::token::{parse_expiry, ClaimResult};

pub const DEFAULT_CAPACITY: usize = 4096;

/// What a repeated, previously accepted claim means.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClaimMode {
    /// Admit again without re-verifying.
    #[default]
    Memoize,
    /// Refuse: each nonce may be used once while the token is live.
    RejectReplay,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct ClaimKey {
    token: String,
    nonce: String,
    mac: String,
    context: String,
}

impl ClaimKey {
    fn new(token: &str, nonce: &str, mac: &str, context: &str) -> Self {
        ClaimKey {
            token: token.to_string(),
            nonce: nonce.to_string(),
            mac: mac.to_string(),
            context: context.to_string(),
        }
    }
}

pub struct ClaimCache {
    entries: Mutex<LruCache<ClaimKey, u64>>,
    mode: ClaimMode,
}

impl ClaimCache {
    pub fn new(capacity: usize, mode: ClaimMode) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ClaimCache {
            entries: Mutex::new(LruCache::new(capacity)),
            mode,
        }
    }

    pub fn mode(&self) -> ClaimMode {
        self.mode
    }

    /// Decision for a claim seen before, or `None` if it must be verified.
    pub fn lookup(
        &self,
        token: &str,
        nonce: &str,
        mac: &str,
        context: &str,
        now_ms: u64,
    ) -> Option<ClaimResult> {
        let key = ClaimKey::new(token, nonce, mac, context);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expiry = *entries.get(&key)?;
        if expiry < now_ms {
            entries.pop(&key);
            debug!("claim cache: evicted expired entry");
            return None;
        }
        match self.mode {
            ClaimMode::Memoize => Some(ClaimResult::Ok),
            ClaimMode::RejectReplay => {
                debug!("claim cache: replayed claim");
                Some(ClaimResult::NotOk)
            }
        }
    }

    /// Remember a claim that just verified.
    pub fn insert(&self, token: &str, nonce: &str, mac: &str, context: &str) {
        let Ok(expiry) = parse_expiry(token) else {
            return;
        };
        let key = ClaimKey::new(token, nonce, mac, context);
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(key, expiry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClaimCache {
    fn default() -> Self {
        ClaimCache::new(DEFAULT_CAPACITY, ClaimMode::default())
    }
}
