//! Cache-entry and in-flight bookkeeping types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::Instant;

use exchange_rates::round_to_minor_units;
use fx_types::{Conversion, ExchangeError};

/// Rate and reference date produced by one upstream fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSnapshot {
    pub rate: Decimal,
    pub rate_date: NaiveDate,
}

impl RateSnapshot {
    /// Converts `amount` into `to` at this rate, rounded to its minor units.
    pub fn apply(&self, amount: Decimal, to: &str) -> Result<Conversion, ExchangeError> {
        let converted =
            amount
                .checked_mul(self.rate)
                .ok_or(ExchangeError::AmountOutOfRange {
                    amount,
                    rate: self.rate,
                })?;
        Ok(Conversion::new(
            round_to_minor_units(converted, to),
            self.rate,
            self.rate_date,
        ))
    }
}

/// Outcome shared with every waiter of a fetch.
pub type FetchOutcome = Result<RateSnapshot, ExchangeError>;

/// Last known good rate for one pair.
#[derive(Debug, Clone, Copy)]
pub struct CacheEntry {
    pub snapshot: RateSnapshot,
    /// Fetch completion time plus TTL.
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(snapshot: RateSnapshot, expires_at: Instant) -> Self {
        Self {
            snapshot,
            expires_at,
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// One in-flight upstream call, shared by every caller waiting on its pair.
///
/// The table keeps a receiver; the fetch task owns the only sender and
/// publishes exactly once.
#[derive(Debug)]
pub struct PendingFetch {
    id: u64,
    outcome: watch::Receiver<Option<FetchOutcome>>,
}

impl PendingFetch {
    /// Creates the pending record and the sender that completes it.
    pub fn new(id: u64) -> (Self, watch::Sender<Option<FetchOutcome>>) {
        let (tx, rx) = watch::channel(None);
        (Self { id, outcome: rx }, tx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// A fresh handle on the completion signal for one more waiter.
    pub fn subscribe(&self) -> watch::Receiver<Option<FetchOutcome>> {
        self.outcome.clone()
    }
}

/// Waits for the fetch behind `rx` to publish its outcome.
///
/// A dropped sender without a published value means the fetch task died.
pub async fn wait_outcome(rx: &mut watch::Receiver<Option<FetchOutcome>>) -> FetchOutcome {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => outcome.clone().unwrap_or(Err(ExchangeError::FetchAborted)),
        Err(_) => Err(ExchangeError::FetchAborted),
    }
}
