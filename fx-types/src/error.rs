//! Error types for currency conversion.

use rust_decimal::Decimal;

/// Errors returned by any [`ExchangeRateProvider`](crate::ExchangeRateProvider),
/// including the caching decorator.
///
/// The type is `Clone` because a single upstream outcome is broadcast to
/// every caller waiting on the same fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────
    #[error("No upstream exchange rate provider configured")]
    MissingProvider,

    // ─────────────────────────────────────────────────────────────────────────
    // Upstream
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Unexpected upstream status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Rate not available for {from} -> {to}")]
    RateNotAvailable { from: String, to: String },

    #[error("Invalid rate {rate} for {from} -> {to}")]
    InvalidRate {
        from: String,
        to: String,
        rate: Decimal,
    },

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    #[error("Upstream fetch ended without a result")]
    FetchAborted,

    // ─────────────────────────────────────────────────────────────────────────
    // Input
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Amount {amount} at rate {rate} is out of range")]
    AmountOutOfRange { amount: Decimal, rate: Decimal },

    // ─────────────────────────────────────────────────────────────────────────
    // Caller-local
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Request cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl ExchangeError {
    /// True for failures of the upstream capability itself.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ExchangeError::ServiceUnavailable(_)
                | ExchangeError::UnexpectedStatus { .. }
                | ExchangeError::RateNotAvailable { .. }
                | ExchangeError::InvalidRate { .. }
                | ExchangeError::Decode(_)
                | ExchangeError::FetchAborted
        )
    }

    /// True when only the calling context gave up waiting.
    pub fn is_caller_local(&self) -> bool {
        matches!(
            self,
            ExchangeError::Cancelled | ExchangeError::DeadlineExceeded
        )
    }
}

/// Checks that an upstream rate is strictly positive.
pub fn validate_rate(from: &str, to: &str, rate: Decimal) -> Result<Decimal, ExchangeError> {
    if rate <= Decimal::ZERO {
        return Err(ExchangeError::InvalidRate {
            from: from.to_string(),
            to: to.to_string(),
            rate,
        });
    }
    Ok(rate)
}
