//! # FX Client
//!
//! HTTP [`ExchangeRateProvider`] for a Frankfurter-style rates API
//! (`GET /latest?from=X&to=Y`).

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use exchange_rates::round_to_minor_units;
use fx_types::{CallContext, Conversion, ExchangeError, ExchangeRateProvider, PairKey, validate_rate};

/// Public endpoint used when no base URL is configured.
pub const DEFAULT_API_URL: &str = "https://api.frankfurter.app";

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ClientError> for ExchangeError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) if e.is_decode() => ExchangeError::Decode(e.to_string()),
            ClientError::Http(e) => ExchangeError::ServiceUnavailable(e.to_string()),
            ClientError::Api { status, message } => ExchangeError::UnexpectedStatus {
                status,
                body: message,
            },
            ClientError::Json(e) => ExchangeError::Decode(e.to_string()),
        }
    }
}

/// Body of a `/latest` response.
#[derive(Debug, Deserialize)]
pub struct LatestRates {
    pub base: String,
    pub date: NaiveDate,
    pub rates: HashMap<String, serde_json::Number>,
}

impl LatestRates {
    /// Exact decimal rate for `to`, parsed from the JSON number text.
    pub fn rate_for(&self, to: &str) -> Option<Decimal> {
        let text = self.rates.get(to)?.to_string();
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok()
    }
}

/// Rates API client.
pub struct FrankfurterClient {
    base_url: String,
    http: Client,
}

impl Default for FrankfurterClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl FrankfurterClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Uses a preconfigured HTTP client (proxies, TLS, pooling).
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Applies a per-request timeout on top of the caller's context.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ClientError> {
        self.http = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the latest rate for one pair.
    pub async fn latest(&self, from: &str, to: &str) -> Result<LatestRates, ClientError> {
        let resp = self
            .http
            .get(format!("{}/latest", self.base_url))
            .query(&[("from", from), ("to", to)])
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn handle_response(&self, resp: reqwest::Response) -> Result<LatestRates, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn fetch_rate(&self, pair: &PairKey) -> Result<(Decimal, NaiveDate), ExchangeError> {
        let latest = self.latest(pair.from(), pair.to()).await?;
        let rate = latest
            .rate_for(pair.to())
            .ok_or_else(|| ExchangeError::RateNotAvailable {
                from: pair.from().to_string(),
                to: pair.to().to_string(),
            })?;
        let rate = validate_rate(pair.from(), pair.to(), rate)?;
        debug!(pair = %pair, base = %latest.base, %rate, date = %latest.date, "Fetched latest rate");
        Ok((rate, latest.date))
    }
}

#[async_trait::async_trait]
impl ExchangeRateProvider for FrankfurterClient {
    async fn convert(
        &self,
        ctx: &CallContext,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Conversion, ExchangeError> {
        let pair = PairKey::new(from, to);

        if pair.is_same_currency() {
            return Ok(Conversion::new(
                round_to_minor_units(amount, pair.to()),
                Decimal::ONE,
                chrono::Utc::now().date_naive(),
            ));
        }

        let (rate, rate_date) = tokio::select! {
            biased;
            reason = ctx.done() => return Err(reason),
            fetched = self.fetch_rate(&pair) => fetched?,
        };

        let converted = amount
            .checked_mul(rate)
            .ok_or(ExchangeError::AmountOutOfRange { amount, rate })?;
        Ok(Conversion::new(
            round_to_minor_units(converted, pair.to()),
            rate,
            rate_date,
        ))
    }
}
