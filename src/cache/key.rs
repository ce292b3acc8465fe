//! Deterministic cache keys
//!
//! A key is `<namespace>:<hex sha256>` where the digest covers the request
//! parameters sorted by name. Identical inputs map to the same key in every
//! process, unlike keys built from `std::hash`, whose seeds change per run.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// A cache key derived from a namespace and request parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Starts a key in `namespace` (e.g. `"weather_forecast"`)
    pub fn builder(namespace: impl Into<String>) -> CacheKeyBuilder {
        CacheKeyBuilder {
            namespace: namespace.into(),
            params: BTreeMap::new(),
        }
    }

    /// Returns the key text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trims, sorts and de-duplicates a set of strings, dropping blanks
///
/// Clients hash and send the same normalized list.
pub fn normalize_set<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut values: Vec<String> = values
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    values.sort();
    values.dedup();
    values
}

/// Collects named parameters for a [`CacheKey`]
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    namespace: String,
    params: BTreeMap<String, Value>,
}

impl CacheKeyBuilder {
    /// Adds a parameter; insertion order does not affect the key
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Adds a set-like list parameter, normalized with [`normalize_set`]
    pub fn param_set<I, S>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.param(name, normalize_set(values))
    }

    /// Finishes the key
    pub fn build(self) -> CacheKey {
        // Compact JSON keeps "5" and 5 apart
        let canonical = self
            .params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&");

        let digest = Sha256::digest(canonical.as_bytes());
        CacheKey(format!("{}:{}", self.namespace, hex::encode(digest)))
    }
}
