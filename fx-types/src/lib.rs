//! # FX Types
//!
//! Domain types and port traits shared by the exchange rate cache and its
//! providers. This crate performs no IO - only data structures, the call
//! context, and trait definitions.
//!
//! ## Architecture
//!
//! - `domain/` - Pure domain types (PairKey, Conversion)
//! - `ports/` - Trait definitions that providers must implement
//! - `context` - Per-call cancellation, deadline and request id
//! - `error` - Error taxonomy shared by every provider

pub mod context;
pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use context::CallContext;
pub use domain::{Conversion, PAIR_SEPARATOR, PairKey};
pub use error::{ExchangeError, validate_rate};
pub use ports::ExchangeRateProvider;
