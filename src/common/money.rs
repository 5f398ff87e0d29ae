// src/common/money.rs

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Hkd,
}

impl Currency {
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Hkd => "$",
        }
    }
}

/// Amount in integer minor units (cents).
///
/// Amounts arrive from the dashboard as display strings like `"$250.00"`.
/// They are parsed once, here, and carried as integers from then on.
/// Parsing is best-effort: anything unreadable is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Money {
    minor_units: i64,
    currency: Currency,
}

impl Money {
    pub const ZERO: Money = Money { minor_units: 0, currency: Currency::Hkd };

    pub fn from_minor(minor_units: i64) -> Self {
        Self { minor_units, currency: Currency::default() }
    }

    pub fn from_major(major_units: i64) -> Self {
        Self::from_minor(major_units.saturating_mul(100))
    }

    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    pub fn is_zero(&self) -> bool {
        self.minor_units == 0
    }

    pub fn is_positive(&self) -> bool {
        self.minor_units > 0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.minor_units, 2)
    }

    pub fn from_decimal(value: Decimal) -> Self {
        let cents = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            * Decimal::ONE_HUNDRED;
        Self::from_minor(cents.to_i64().unwrap_or(0))
    }

    /// Whole major units, rounded once, half away from zero.
    pub fn from_decimal_whole(value: Decimal) -> Self {
        Self::from_decimal(value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Parses a display amount such as `"$1,250.50"` or `"HK$ 300"`.
    ///
    /// Every character other than digits and `.` is dropped, then the longest
    /// leading `digits[.digits]` run is read. Signs are dropped with the rest,
    /// so the result is never negative.
    pub fn parse_lenient(raw: &str) -> Self {
        let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();

        let mut end = 0;
        let mut seen_dot = false;
        for (idx, ch) in cleaned.char_indices() {
            if ch == '.' {
                if seen_dot {
                    break;
                }
                seen_dot = true;
            }
            end = idx + ch.len_utf8();
        }

        let numeric = cleaned[..end].trim_end_matches('.');
        if numeric.is_empty() || numeric == "." {
            return Self::ZERO;
        }
        let numeric = if numeric.starts_with('.') {
            format!("0{numeric}")
        } else {
            numeric.to_string()
        };

        Decimal::from_str(&numeric)
            .map(Self::from_decimal)
            .unwrap_or(Self::ZERO)
    }

    fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::parse_lenient(s),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::from_major(i)
                } else {
                    n.as_f64()
                        .and_then(|f| Decimal::try_from(f).ok())
                        .map(Self::from_decimal)
                        .unwrap_or(Self::ZERO)
                }
            }
            _ => Self::ZERO,
        }
    }

    /// Display form of a member's cached balance.
    pub fn balance_label(&self) -> String {
        if self.is_positive() {
            format!("{self} Outstanding")
        } else {
            "$0".to_string()
        }
    }
}

impl From<i64> for Money {
    fn from(minor_units: i64) -> Self {
        Self::from_minor(minor_units)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor_units < 0 { "-" } else { "" };
        let abs = self.minor_units.unsigned_abs();
        write!(f, "{sign}{}{}.{:02}", self.currency.symbol(), abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money {
            minor_units: self.minor_units.saturating_add(rhs.minor_units),
            currency: self.currency,
        }
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money {
            minor_units: self.minor_units.saturating_sub(rhs.minor_units),
            currency: self.currency,
        }
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Money::from_json(&value))
    }
}

/// `serialize_with` helper for `Member.balance`.
pub fn serialize_balance<S: Serializer>(money: &Money, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&money.balance_label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_strings() {
        assert_eq!(Money::parse_lenient("$250.00").minor_units(), 25_000);
        assert_eq!(Money::parse_lenient("$1,250.5").minor_units(), 125_050);
        assert_eq!(Money::parse_lenient("$250 Outstanding").minor_units(), 25_000);
        assert_eq!(Money::parse_lenient("HK$ 80").minor_units(), 8_000);
        assert_eq!(Money::parse_lenient(".5").minor_units(), 50);
    }

    #[test]
    fn malformed_amounts_are_zero() {
        assert!(Money::parse_lenient("").is_zero());
        assert!(Money::parse_lenient("N/A").is_zero());
        assert!(Money::parse_lenient("$.").is_zero());
    }

    #[test]
    fn keeps_leading_number_when_several_dots() {
        assert_eq!(Money::parse_lenient("1.2.3").minor_units(), 120);
    }

    #[test]
    fn deserializes_numbers_strings_and_junk() {
        let parsed: Vec<Money> =
            serde_json::from_str(r#"["$10.25", 7, 3.5, null, {"x": 1}]"#).unwrap();
        let cents: Vec<i64> = parsed.iter().map(Money::minor_units).collect();
        assert_eq!(cents, vec![1_025, 700, 350, 0, 0]);
    }

    #[test]
    fn formats_amount_and_balance() {
        assert_eq!(Money::from_minor(25_000).to_string(), "$250.00");
        assert_eq!(Money::from_minor(5).to_string(), "$0.05");
        assert_eq!(Money::from_minor(25_050).balance_label(), "$250.50 Outstanding");
        assert_eq!(Money::ZERO.balance_label(), "$0");
    }

    #[test]
    fn rounds_to_whole_units() {
        assert_eq!(Money::from_decimal_whole(Decimal::new(3_350, 2)), Money::from_major(34));
        assert_eq!(Money::from_decimal_whole(Decimal::new(3_349, 2)), Money::from_major(33));
        // 100.495 is below the half, even though it shows as 100.50 in cents
        assert_eq!(Money::from_decimal_whole(Decimal::new(100_495, 3)), Money::from_major(100));
    }
}
