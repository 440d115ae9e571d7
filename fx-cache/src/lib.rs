//! # FX Cache
//!
//! A caching decorator for a rate-limited conversion service.
//!
//! ## Architecture
//!
//! - `cache` - [`CoalescingRateCache`], the TTL cache and fetch coalescing
//! - `entry` - cache-entry and in-flight bookkeeping types
//! - `config` - TTL and cleanup settings
//! - `stats` - hit/miss/coalescing counters
//!
//! The cache is generic over `P: ExchangeRateProvider` and implements the
//! same port, so it can be used anywhere the raw provider is.

pub mod cache;
pub mod config;
pub mod entry;
pub mod stats;


pub use cache::CoalescingRateCache;
pub use config::{CacheConfig, DEFAULT_TTL, MAX_CLEANUP_INTERVAL, MAX_TTL};
pub use stats::CacheStats;
