//! Currency Table and Offline Exchange Rates
//!
//! This library describes the currencies the FX tooling knows about and
//! provides [`FixedRateProvider`], an offline [`ExchangeRateProvider`] backed
//! by the same table. Currencies are defined declaratively using a macro that
//! generates the `CurrencyCode` enum and its metadata lookups.
//!
//! # Adding a New Currency
//! Simply add a line to the `define_currencies!` macro invocation:
//! ```ignore
//! define_currencies! {
//!     // ... existing currencies ...
//!     NOK => ("NOK", "kr", 2, 0.094, 0.4),
//! }
//! ```
//!
//! # Example
//! ```
//! use exchange_rates::{CurrencyCode, minor_units, round_to_minor_units};
//! use rust_decimal::Decimal;
//!
//! assert_eq!(minor_units("jpy"), 0);
//! assert_eq!("sgd".parse::<CurrencyCode>().unwrap(), CurrencyCode::SGD);
//!
//! let rounded = round_to_minor_units(Decimal::new(13_505, 3), "SGD");
//! assert_eq!(rounded.to_string(), "13.51");
//! ```

use std::str::FromStr;

use chrono::NaiveDate;
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};

use fx_types::{CallContext, Conversion, ExchangeError, ExchangeRateProvider, PairKey};

/// Decimal places used for codes missing from the currency table.
pub const DEFAULT_MINOR_UNITS: u32 = 2;

/// Decimal places kept on derived cross rates.
pub const RATE_PRECISION: u32 = 6;

// ─────────────────────────────────────────────────────────────────────────────
// THE MACRO: Defines all currencies and the CurrencyCode enum
// ─────────────────────────────────────────────────────────────────────────────

/// Macro to define currencies with auto-generated metadata lookups.
///
/// # Syntax
/// ```ignore
/// define_currencies! {
///     Name => ("CODE", "SYMBOL", minor_units, to_usd_rate, variance%),
/// }
/// ```
#[macro_export]
macro_rules! define_currencies {
    (
        $(
            $name:ident => ($code:literal, $symbol:literal, $minor:expr, $to_usd:tt, $variance:expr)
        ),* $(,)?
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "UPPERCASE")]
        pub enum CurrencyCode {
            $($name),*
        }

        impl CurrencyCode {
            pub fn code(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $code),*
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $symbol),*
                }
            }

            /// Number of decimal places in the currency's minor unit.
            pub fn minor_units(&self) -> u32 {
                match self {
                    $(CurrencyCode::$name => $minor),*
                }
            }

            /// Value of one unit of this currency in USD.
            pub fn base_to_usd_rate(&self) -> Decimal {
                match self {
                    $(CurrencyCode::$name => rust_decimal_macros::dec!($to_usd)),*
                }
            }

            pub fn max_variance_percent(&self) -> f64 {
                match self {
                    $(CurrencyCode::$name => $variance),*
                }
            }

            pub fn all() -> &'static [CurrencyCode] {
                &[$(CurrencyCode::$name),*]
            }
        }

        impl std::fmt::Display for CurrencyCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.code())
            }
        }

        impl std::str::FromStr for CurrencyCode {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($code => Ok(CurrencyCode::$name),)*
                    _ => Err(format!("Unknown currency: {}", s)),
                }
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// CURRENCY DEFINITIONS - Add new currencies here!
// ─────────────────────────────────────────────────────────────────────────────

define_currencies! {
    USD => ("USD", "$", 2, 1.0, 0.0),
    EUR => ("EUR", "€", 2, 1.087, 0.5),
    GBP => ("GBP", "£", 2, 1.266, 0.5),
    INR => ("INR", "₹", 2, 0.01203, 0.3),
    SGD => ("SGD", "S$", 2, 0.7407, 0.3),
    CHF => ("CHF", "Fr", 2, 1.13, 0.4),
    AUD => ("AUD", "A$", 2, 0.655, 0.6),
    CAD => ("CAD", "C$", 2, 0.735, 0.4),
    JPY => ("JPY", "¥", 0, 0.0067, 0.6),
    KRW => ("KRW", "₩", 0, 0.00075, 0.6),
    KWD => ("KWD", "KD", 3, 3.25, 0.2),
    BHD => ("BHD", "BD", 3, 2.65, 0.2),
}

// ─────────────────────────────────────────────────────────────────────────────
// Minor-unit rounding
// ─────────────────────────────────────────────────────────────────────────────

/// Decimal places for a currency code; unknown codes use [`DEFAULT_MINOR_UNITS`].
pub fn minor_units(code: &str) -> u32 {
    CurrencyCode::from_str(code)
        .map(|c| c.minor_units())
        .unwrap_or(DEFAULT_MINOR_UNITS)
}

/// Rounds `amount` to the minor-unit precision of `code`, midpoint away from zero.
pub fn round_to_minor_units(amount: Decimal, code: &str) -> Decimal {
    let dp = minor_units(code);
    let mut rounded = amount.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    // 13.5 -> 13.50 so results always show the full minor unit
    rounded.rescale(dp);
    rounded
}

/// Cross rate between two table currencies, using the base USD values.
pub fn get_base_rate(from: CurrencyCode, to: CurrencyCode) -> Decimal {
    if from == to {
        return Decimal::ONE;
    }
    (from.base_to_usd_rate() / to.base_to_usd_rate()).round_dp(RATE_PRECISION)
}

// ─────────────────────────────────────────────────────────────────────────────
// Offline provider
// ─────────────────────────────────────────────────────────────────────────────

/// Offline provider that serves cross rates from the currency table.
///
/// Optionally jitters each rate within the currency's configured variance to
/// simulate a live market.
#[derive(Debug, Clone)]
pub struct FixedRateProvider {
    rate_date: NaiveDate,
    fluctuation: bool,
}

impl Default for FixedRateProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedRateProvider {
    /// Creates a provider dated today (UTC) with fluctuation disabled.
    pub fn new() -> Self {
        Self {
            rate_date: chrono::Utc::now().date_naive(),
            fluctuation: false,
        }
    }

    pub fn with_rate_date(mut self, rate_date: NaiveDate) -> Self {
        self.rate_date = rate_date;
        self
    }

    /// Enable random rate fluctuation for realistic simulation.
    pub fn with_fluctuation(mut self, enabled: bool) -> Self {
        self.fluctuation = enabled;
        self
    }

    pub fn rate_date(&self) -> NaiveDate {
        self.rate_date
    }

    /// Returns the rate this provider would quote right now.
    pub fn quote(&self, from: &str, to: &str) -> Result<Decimal, ExchangeError> {
        let pair = PairKey::new(from, to);
        let not_available = || ExchangeError::RateNotAvailable {
            from: pair.from().to_string(),
            to: pair.to().to_string(),
        };
        let from_code = CurrencyCode::from_str(pair.from()).map_err(|_| not_available())?;
        let to_code = CurrencyCode::from_str(pair.to()).map_err(|_| not_available())?;

        if from_code == to_code {
            return Ok(Decimal::ONE);
        }

        let rate = fluctuate(
            from_code.base_to_usd_rate(),
            from_code.max_variance_percent(),
            self.fluctuation,
        ) / fluctuate(
            to_code.base_to_usd_rate(),
            to_code.max_variance_percent(),
            self.fluctuation,
        );
        Ok(rate.round_dp(RATE_PRECISION))
    }
}

fn fluctuate(base_rate: Decimal, max_variance_percent: f64, enabled: bool) -> Decimal {
    if !enabled || max_variance_percent == 0.0 {
        return base_rate;
    }
    let random_factor: f64 = rand::rng().random_range(-1.0..=1.0);
    let variance = Decimal::from_f64_retain(max_variance_percent / 100.0 * random_factor)
        .unwrap_or(Decimal::ZERO);
    base_rate + base_rate * variance
}

#[async_trait::async_trait]
impl ExchangeRateProvider for FixedRateProvider {
    async fn convert(
        &self,
        _ctx: &CallContext,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Conversion, ExchangeError> {
        let rate = self.quote(from, to)?;
        let converted = amount
            .checked_mul(rate)
            .ok_or(ExchangeError::AmountOutOfRange { amount, rate })?;
        Ok(Conversion::new(
            round_to_minor_units(converted, to),
            rate,
            self.rate_date,
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!(" eur ".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert!("XXX".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_currency_code_display() {
        assert_eq!(CurrencyCode::SGD.to_string(), "SGD");
    }

    #[test]
    fn test_minor_units_lookup() {
        assert_eq!(minor_units("usd"), 2);
        assert_eq!(minor_units("JPY"), 0);
        assert_eq!(minor_units("KWD"), 3);
        assert_eq!(minor_units("ZZZ"), DEFAULT_MINOR_UNITS);
    }

    #[test]
    fn test_round_to_minor_units() {
        assert_eq!(round_to_minor_units(dec!(13.5), "SGD"), dec!(13.50));
        assert_eq!(round_to_minor_units(dec!(13.5), "SGD").to_string(), "13.50");
        assert_eq!(round_to_minor_units(dec!(2.345), "USD"), dec!(2.35));
        assert_eq!(round_to_minor_units(dec!(-2.345), "USD"), dec!(-2.35));
        assert_eq!(round_to_minor_units(dec!(1234.5), "JPY"), dec!(1235));
        assert_eq!(round_to_minor_units(dec!(1.23456), "KWD"), dec!(1.235));
    }

    #[test]
    fn test_get_base_rate() {
        assert_eq!(get_base_rate(CurrencyCode::USD, CurrencyCode::USD), Decimal::ONE);
        let rate = get_base_rate(CurrencyCode::USD, CurrencyCode::INR);
        assert!((rate - dec!(83.12)).abs() < dec!(1));
    }

    #[test]
    fn test_currency_code_all() {
        assert_eq!(CurrencyCode::all().len(), 12);
        for code in CurrencyCode::all() {
            assert!(code.base_to_usd_rate() > Decimal::ZERO, "{code}");
        }
        assert_eq!(CurrencyCode::USD.base_to_usd_rate(), Decimal::ONE);
        assert_eq!(CurrencyCode::KRW.base_to_usd_rate(), dec!(0.00075));
    }

    #[tokio::test]
    async fn test_fixed_provider_converts() {
        let provider =
            FixedRateProvider::new().with_rate_date(NaiveDate::from_ymd_opt(2026, 2, 14).unwrap());
        let ctx = CallContext::new();

        let conversion = provider
            .convert(&ctx, dec!(10), "usd", "eur")
            .await
            .unwrap();

        assert_eq!(conversion.rate, get_base_rate(CurrencyCode::USD, CurrencyCode::EUR));
        assert_eq!(conversion.rate_date, provider.rate_date());
        assert_eq!(conversion.amount, round_to_minor_units(dec!(10) * conversion.rate, "EUR"));
    }

    #[tokio::test]
    async fn test_fixed_provider_same_currency_is_one() {
        let provider = FixedRateProvider::new().with_fluctuation(true);
        let conversion = provider
            .convert(&CallContext::new(), dec!(42.10), "GBP", " gbp")
            .await
            .unwrap();
        assert_eq!(conversion.rate, Decimal::ONE);
        assert_eq!(conversion.amount, dec!(42.10));
    }

    #[tokio::test]
    async fn test_fixed_provider_unknown_currency() {
        let provider = FixedRateProvider::new();
        let result = provider
            .convert(&CallContext::new(), dec!(1), "USD", "XYZ")
            .await;
        assert_eq!(
            result,
            Err(ExchangeError::RateNotAvailable {
                from: "USD".into(),
                to: "XYZ".into()
            })
        );
    }

    #[tokio::test]
    async fn test_fixed_provider_overflow_is_an_error() {
        let provider = FixedRateProvider::new();
        let result = provider
            .convert(&CallContext::new(), Decimal::MAX, "USD", "INR")
            .await;
        assert!(matches!(
            result,
            Err(ExchangeError::AmountOutOfRange { amount, .. }) if amount == Decimal::MAX
        ));
    }

    #[test]
    fn test_fluctuation_stays_within_variance() {
        let provider = FixedRateProvider::new().with_fluctuation(true);
        let base = get_base_rate(CurrencyCode::EUR, CurrencyCode::USD);
        for _ in 0..50 {
            let rate = provider.quote("EUR", "USD").unwrap();
            assert!(rate > Decimal::ZERO);
            assert!((rate - base).abs() < dec!(0.02));
        }
    }
}
