//! Normalized currency pair key.

use std::fmt;

/// Separator placed between the two codes of a [`PairKey`].
pub const PAIR_SEPARATOR: &str = "->";

/// Order-sensitive, normalized identifier for a (from, to) currency pair.
///
/// Both codes are trimmed and uppercased, so `"usd","sgd"` and
/// `" usd","SGD "` address the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    key: String,
    split: usize,
}

impl PairKey {
    /// Builds a normalized key from two raw currency codes.
    pub fn new(from: &str, to: &str) -> Self {
        let from = from.trim().to_uppercase();
        let to = to.trim().to_uppercase();
        let split = from.len();
        Self {
            key: format!("{}{}{}", from, PAIR_SEPARATOR, to),
            split,
        }
    }

    /// Normalized source currency code.
    pub fn from(&self) -> &str {
        &self.key[..self.split]
    }

    /// Normalized target currency code.
    pub fn to(&self) -> &str {
        &self.key[self.split + PAIR_SEPARATOR.len()..]
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn is_same_currency(&self) -> bool {
        self.from() == self.to()
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
