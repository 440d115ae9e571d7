//! Result of a currency conversion.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A converted amount together with the rate that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// Converted amount in the target currency.
    pub amount: Decimal,
    /// Multiplier from source to target currency.
    pub rate: Decimal,
    /// Date the provider asserts the rate is valid for.
    pub rate_date: NaiveDate,
}

impl Conversion {
    pub fn new(amount: Decimal, rate: Decimal, rate_date: NaiveDate) -> Self {
        Self {
            amount,
            rate,
            rate_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_conversion_serializes_date_as_iso() {
        let conversion = Conversion::new(
            dec!(13.50),
            dec!(1.35),
            NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
        );
        let json = serde_json::to_value(conversion).unwrap();
        assert_eq!(json["rate_date"], "2026-02-14");
        assert_eq!(json["amount"], "13.50");
    }
}
