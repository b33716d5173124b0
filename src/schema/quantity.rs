use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Hours in a billing month. Always-on resources are charged this many hours
/// unless usage says otherwise.
pub const HOURS_PER_MONTH: Decimal = dec!(730);

/// 730 / 24, rounded to 24 places.
pub const DAYS_IN_MONTH: Decimal = dec!(30.416666666666666666666667);

/// A usage-derived amount that may not be known yet.
///
/// `Unset` means "depends on usage nobody told us about" and must never be
/// read as zero: the cost it produces is unknown, not free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Decimal>", into = "Option<Decimal>")]
pub enum Quantity {
    #[default]
    Unset,
    Value(Decimal),
}

impl Quantity {
    pub fn value(self) -> Option<Decimal> {
        match self {
            Quantity::Unset => None,
            Quantity::Value(v) => Some(v),
        }
    }

    pub fn is_set(self) -> bool {
        matches!(self, Quantity::Value(_))
    }

    pub fn map(self, f: impl FnOnce(Decimal) -> Decimal) -> Quantity {
        match self {
            Quantity::Unset => Quantity::Unset,
            Quantity::Value(v) => Quantity::Value(f(v)),
        }
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Quantity::Value(value)
    }
}

impl From<Option<Decimal>> for Quantity {
    fn from(value: Option<Decimal>) -> Self {
        value.map_or(Quantity::Unset, Quantity::Value)
    }
}

impl From<Quantity> for Option<Decimal> {
    fn from(value: Quantity) -> Self {
        value.value()
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Quantity::Value(Decimal::from(value))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Unset => f.write_str("-"),
            Quantity::Value(v) => write!(f, "{}", v.normalize()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_is_not_zero() {
        assert_ne!(Quantity::Unset, Quantity::Value(Decimal::ZERO));
        assert_eq!(Quantity::Unset.value(), None);
        assert_eq!(Quantity::Unset.map(|v| v * dec!(3)), Quantity::Unset);
    }

    #[test]
    fn test_serializes_as_optional_decimal() {
        assert_eq!(serde_json::to_string(&Quantity::Unset).unwrap(), "null");
        let q: Quantity = serde_json::from_str("\"2.5\"").unwrap();
        assert_eq!(q, Quantity::Value(dec!(2.5)));
        let q: Quantity = serde_json::from_str("4").unwrap();
        assert_eq!(q, Quantity::Value(dec!(4)));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!((HOURS_PER_MONTH / dec!(24)).round_dp(24), DAYS_IN_MONTH);
    }
}
