//! Domain models for currency conversion.

pub mod conversion;
pub mod pair;

pub use conversion::Conversion;
pub use pair::{PAIR_SEPARATOR, PairKey};
