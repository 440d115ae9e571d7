//! Cache configuration.

use std::time::Duration;

use tokio::time::Instant;

/// TTL used when none (or a non-positive one) is configured.
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Upper bound on the interval between cleanup passes.
pub const MAX_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Longest TTL honored; larger values are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Construction-time settings for [`CoalescingRateCache`](crate::CoalescingRateCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Freshness window of an entry, measured from fetch completion.
    pub ttl: Duration,
    /// Ceiling on how often expired entries are swept.
    pub max_cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_cleanup_interval: MAX_CLEANUP_INTERVAL,
        }
    }
}

impl CacheConfig {
    /// Config with the given TTL; zero falls back to [`DEFAULT_TTL`] and
    /// anything above [`MAX_TTL`] is clamped.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: if ttl.is_zero() { DEFAULT_TTL } else { ttl.min(MAX_TTL) },
            ..Self::default()
        }
    }

    /// Config from a signed number of seconds, as read from the environment.
    pub fn from_ttl_secs(secs: i64) -> Self {
        if secs <= 0 {
            return Self::default();
        }
        Self::with_ttl(Duration::from_secs(secs.unsigned_abs()))
    }

    /// Expiry of an entry committed at `now`. Never overflows, even when
    /// `ttl` was set directly past [`MAX_TTL`].
    pub fn expires_at(&self, now: Instant) -> Instant {
        now.checked_add(self.ttl.min(MAX_TTL)).unwrap_or(now)
    }

    /// `min(ttl, max_cleanup_interval)`.
    pub fn cleanup_interval(&self) -> Duration {
        self.ttl.min(self.max_cleanup_interval)
    }
}
