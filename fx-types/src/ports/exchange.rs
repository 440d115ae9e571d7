//! Exchange rate provider port.
//!
//! This trait defines the interface for conversion services.
//! Implementations can be HTTP clients, fixed-rate tables, the caching
//! decorator, or test doubles.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::context::CallContext;
use crate::domain::Conversion;
use crate::error::ExchangeError;

/// Port trait for exchange rate providers.
#[async_trait::async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Convert `amount` from one currency to another "now".
    ///
    /// Currency codes are case-insensitive. Returns the converted amount,
    /// the rate applied and the date that rate is valid for.
    async fn convert(
        &self,
        ctx: &CallContext,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Conversion, ExchangeError>;
}

#[async_trait::async_trait]
impl<P: ExchangeRateProvider + ?Sized> ExchangeRateProvider for Arc<P> {
    async fn convert(
        &self,
        ctx: &CallContext,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Conversion, ExchangeError> {
        (**self).convert(ctx, amount, from, to).await
    }
}
