//! In-process fallback store
//!
//! Values are kept as `serde_json::Value` trees, never as encoded text.
//! By default the time-to-live passed on insert is recorded but not
//! enforced, so entries live for the whole process.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether the in-memory fallback honours entry time-to-live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalTtlPolicy {
    /// Entries never expire
    #[default]
    Ignore,
    /// Expired entries are dropped when read or swept
    Enforce,
}

#[derive(Debug, Clone)]
struct LocalEntry {
    value: Value,
    /// `None` when the ttl overflows the calendar
    expires_at: Option<DateTime<Utc>>,
}

impl LocalEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }
}

/// Concurrency-safe key/value map backing the `Local` cache mode
#[derive(Debug, Default)]
pub struct LocalStore {
    entries: DashMap<String, LocalEntry>,
    policy: LocalTtlPolicy,
}

impl LocalStore {
    /// Creates an empty store with the given expiry policy
    pub fn new(policy: LocalTtlPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
        }
    }

    /// Returns the expiry policy in force
    pub fn policy(&self) -> LocalTtlPolicy {
        self.policy
    }

    /// Looks up `key`, dropping it first if it has expired under `Enforce`
    pub fn get(&self, key: &str) -> Option<Value> {
        if self.policy == LocalTtlPolicy::Enforce {
            let now = Utc::now();
            if self
                .entries
                .remove_if(key, |_, entry| entry.is_expired(now))
                .is_some()
            {
                tracing::debug!(key = %key, "Local cache entry expired");
                return None;
            }
        }

        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key`, replacing any previous entry
    pub fn insert(&self, key: &str, value: Value, ttl: Duration) {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));

        self.entries
            .insert(key.to_string(), LocalEntry { value, expires_at });
    }

    /// Removes `key`; missing keys are not an error
    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drops every expired entry and returns how many were removed
    ///
    /// Does nothing under [`LocalTtlPolicy::Ignore`].
    pub fn purge_expired(&self) -> usize {
        if self.policy == LocalTtlPolicy::Ignore {
            return 0;
        }

        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            tracing::info!(removed, remaining = self.entries.len(), "Purged expired local cache entries");
        }
        removed
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
