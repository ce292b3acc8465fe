//! ronin-cache library
//!
//! A cache facade that keeps working when Redis does not, and cache-aside
//! clients for the search, events, and weather APIs built on top of it.

pub mod cache;
pub mod cli;
pub mod data;
pub mod settings;

pub use cache::{BackendMode, CacheConfig, CacheFacade, CacheKey, LocalTtlPolicy};
pub use data::CachedFetcher;
pub use settings::Settings;
