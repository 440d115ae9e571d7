//! Coalescing TTL cache.
//!
//! Wraps an [`ExchangeRateProvider`] and serves conversions from the last
//! rate observed for each pair. On a miss, exactly one upstream fetch per
//! pair runs at a time; every caller that arrives meanwhile joins it.
//!
//! The fetch runs in a detached task with a context stripped of any caller's
//! cancellation, so a caller that gives up never tears down the fetch other
//! callers depend on. Each caller races the shared completion signal against
//! its own [`CallContext`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{Instrument, debug, debug_span, trace};

use fx_types::{
    CallContext, Conversion, ExchangeError, ExchangeRateProvider, PairKey, validate_rate,
};

use crate::config::CacheConfig;
use crate::entry::{CacheEntry, FetchOutcome, PendingFetch, RateSnapshot, wait_outcome};
use crate::stats::{CacheStats, StatsCounters};

/// Tables guarded by the cache lock.
struct CacheState {
    entries: HashMap<PairKey, CacheEntry>,
    pending: HashMap<PairKey, PendingFetch>,
    last_pruned: Instant,
}

struct Inner<P> {
    provider: Option<Arc<P>>,
    config: CacheConfig,
    state: RwLock<CacheState>,
    stats: StatsCounters,
    next_fetch_id: AtomicU64,
}

/// Caching decorator around an exchange rate provider.
///
/// Generic over `P: ExchangeRateProvider` like any other consumer of the
/// port, and itself an [`ExchangeRateProvider`]. Cloning is cheap and every
/// clone shares the same tables.
pub struct CoalescingRateCache<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for CoalescingRateCache<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: ExchangeRateProvider + 'static> CoalescingRateCache<P> {
    /// Wraps `provider`; a zero `ttl` selects the default.
    pub fn new(provider: P, ttl: Duration) -> Self {
        Self::with_config(Some(provider), CacheConfig::with_ttl(ttl))
    }

    pub fn with_config(provider: Option<P>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider: provider.map(Arc::new),
                config,
                state: RwLock::new(CacheState {
                    entries: HashMap::new(),
                    pending: HashMap::new(),
                    last_pruned: Instant::now(),
                }),
                stats: StatsCounters::default(),
                next_fetch_id: AtomicU64::new(1),
            }),
        }
    }

    /// A cache with nothing to wrap. Every conversion fails with
    /// [`ExchangeError::MissingProvider`].
    pub fn unconfigured(ttl: Duration) -> Self {
        Self::with_config(None, CacheConfig::with_ttl(ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.inner.config.ttl
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config
    }

    /// Number of cached entries, fresh or not yet pruned.
    pub fn len(&self) -> usize {
        self.inner.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of upstream fetches currently in flight.
    pub fn pending_len(&self) -> usize {
        self.inner.state.read().pending.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot()
    }

    /// Drops the cached rate for one pair. An in-flight fetch is unaffected
    /// and will repopulate the entry when it completes.
    pub fn invalidate(&self, from: &str, to: &str) -> bool {
        let key = PairKey::new(from, to);
        self.inner.state.write().entries.remove(&key).is_some()
    }

    /// Drops every cached rate.
    pub fn clear(&self) {
        self.inner.state.write().entries.clear();
    }

    /// Removes every expired entry now, regardless of the cleanup throttle.
    pub fn prune_expired(&self) -> usize {
        let mut state = self.inner.state.write();
        let now = Instant::now();
        self.inner.prune(&mut state, now)
    }

    /// Converts `amount` using a cached rate, a joined fetch or a new fetch.
    pub async fn convert(
        &self,
        ctx: &CallContext,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Conversion, ExchangeError> {
        let provider = self
            .inner
            .provider
            .as_ref()
            .ok_or(ExchangeError::MissingProvider)?;

        let key = PairKey::new(from, to);

        // Fast path: shared lock only.
        let cached = self.inner.state.read().entries.get(&key).copied();
        if let Some(entry) = cached {
            if entry.is_fresh(Instant::now()) {
                let conversion = entry.snapshot.apply(amount, key.to())?;
                trace!(pair = %key, "Cache hit");
                self.inner.stats.hit();
                return Ok(conversion);
            }
        }

        let mut outcome = {
            let mut state = self.inner.state.write();
            let now = Instant::now();

            // Another caller may have refreshed the entry between the two locks.
            if let Some(entry) = state.entries.get(&key).copied() {
                if entry.is_fresh(now) {
                    let conversion = entry.snapshot.apply(amount, key.to())?;
                    trace!(pair = %key, "Cache hit after re-check");
                    self.inner.stats.hit();
                    return Ok(conversion);
                }
                debug!(pair = %key, "Cache entry expired");
                state.entries.remove(&key);
            }

            if let Some(pending) = state.pending.get(&key) {
                debug!(pair = %key, fetch_id = pending.id(), "Joining in-flight fetch");
                self.inner.stats.coalesced();
                pending.subscribe()
            } else {
                let fetch_id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                let (pending, publisher) = PendingFetch::new(fetch_id);
                let outcome = pending.subscribe();
                state.pending.insert(key.clone(), pending);

                debug!(pair = %key, fetch_id, "Cache miss, starting upstream fetch");
                self.inner.stats.miss();
                self.spawn_fetch(Arc::clone(provider), key.clone(), fetch_id, publisher, ctx);
                outcome
            }
        };

        let snapshot = tokio::select! {
            biased;
            result = wait_outcome(&mut outcome) => result?,
            reason = ctx.done() => {
                debug!(pair = %key, request_id = %ctx.request_id(), "Caller stopped waiting");
                return Err(reason);
            }
        };

        snapshot.apply(amount, key.to())
    }

    fn spawn_fetch(
        &self,
        provider: Arc<P>,
        key: PairKey,
        fetch_id: u64,
        publisher: watch::Sender<Option<FetchOutcome>>,
        ctx: &CallContext,
    ) {
        let fetch_ctx = ctx.detached();
        let span = debug_span!(
            "fx_fetch",
            pair = %key,
            fetch_id,
            request_id = %fetch_ctx.request_id()
        );
        let completion = FetchCompletion {
            inner: Arc::clone(&self.inner),
            key,
            fetch_id,
            publisher: Some(publisher),
        };

        tokio::spawn(
            async move {
                let key = &completion.key;
                let outcome = provider
                    .convert(&fetch_ctx, Decimal::ONE, key.from(), key.to())
                    .await
                    .and_then(|conversion| {
                        let rate = validate_rate(key.from(), key.to(), conversion.rate)?;
                        Ok(RateSnapshot {
                            rate,
                            rate_date: conversion.rate_date,
                        })
                    });
                completion.complete(outcome);
            }
            .instrument(span),
        );
    }
}

impl<P> Inner<P> {
    /// Sweeps expired entries. Caller holds the write lock.
    fn prune(&self, state: &mut CacheState, now: Instant) -> usize {
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_fresh(now));
        state.last_pruned = now;

        let removed = before - state.entries.len();
        if removed > 0 {
            debug!(removed, remaining = state.entries.len(), "Pruned expired rates");
            self.stats.pruned(removed);
        }
        removed
    }

    fn prune_if_due(&self, state: &mut CacheState, now: Instant) {
        if now.duration_since(state.last_pruned) >= self.config.cleanup_interval() {
            self.prune(state, now);
        }
    }

    /// Removes the pending record for `key` if it still belongs to `fetch_id`.
    fn release_pending(&self, state: &mut CacheState, key: &PairKey, fetch_id: u64) {
        if state
            .pending
            .get(key)
            .is_some_and(|pending| pending.id() == fetch_id)
        {
            state.pending.remove(key);
        }
    }
}

/// Owned by the fetch task; commits the outcome and wakes every waiter.
///
/// Dropping it without completing (panic or runtime shutdown) still clears
/// the pending record and wakes waiters with [`ExchangeError::FetchAborted`].
struct FetchCompletion<P> {
    inner: Arc<Inner<P>>,
    key: PairKey,
    fetch_id: u64,
    publisher: Option<watch::Sender<Option<FetchOutcome>>>,
}

impl<P> FetchCompletion<P> {
    fn complete(mut self, outcome: FetchOutcome) {
        let Some(publisher) = self.publisher.take() else {
            return;
        };

        {
            let mut state = self.inner.state.write();
            self.inner
                .release_pending(&mut state, &self.key, self.fetch_id);

            match &outcome {
                Ok(snapshot) => {
                    let now = Instant::now();
                    state.entries.insert(
                        self.key.clone(),
                        CacheEntry::new(*snapshot, self.inner.config.expires_at(now)),
                    );
                    debug!(rate = %snapshot.rate, rate_date = %snapshot.rate_date, "Cached upstream rate");
                    self.inner.prune_if_due(&mut state, now);
                }
                Err(_) => self.inner.stats.failure(),
            }
        }

        publisher.send_replace(Some(outcome));
    }
}

impl<P> Drop for FetchCompletion<P> {
    fn drop(&mut self) {
        if let Some(publisher) = self.publisher.take() {
            {
                let mut state = self.inner.state.write();
                self.inner
                    .release_pending(&mut state, &self.key, self.fetch_id);
            }
            self.inner.stats.failure();
            publisher.send_replace(Some(Err(ExchangeError::FetchAborted)));
        }
    }
}

#[async_trait::async_trait]
impl<P: ExchangeRateProvider + 'static> ExchangeRateProvider for CoalescingRateCache<P> {
    async fn convert(
        &self,
        ctx: &CallContext,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Conversion, ExchangeError> {
        CoalescingRateCache::convert(self, ctx, amount, from, to).await
    }
}
