//! Port traits (interfaces for adapters).
//!
//! The cache and the CLI depend on these traits, not on concrete providers.

mod exchange;

pub use exchange::ExchangeRateProvider;
