use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "gbp";
pub const DEFAULT_CURRENCY_SYMBOL: &str = "£";

//--------------------------------------       Money         ---------------------------------------------------------
/// An amount of money in minor currency units (pence, cents).
///
/// Prices are never held as floats. Stock and pricing arithmetic works on the integer value, and the payment gateway
/// receives the minor-unit amount directly.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Value cannot be represented as a money amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| MoneyConversionError(format!("Value {value} is too large to convert to Money")))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{DEFAULT_CURRENCY_SYMBOL}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Parses decimal strings such as `"10"`, `"10.5"` or `"33.99"` into minor units. More than two decimal places is
/// an error rather than a silent rounding.
impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MoneyConversionError(s.to_string());
        let trimmed = s.trim().trim_start_matches(DEFAULT_CURRENCY_SYMBOL);
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() || frac.len() > 2 {
            return Err(err());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        let whole = whole.parse::<i64>().map_err(|_| err())?;
        let frac = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| err())? * 10,
            _ => frac.parse::<i64>().map_err(|_| err())?,
        };
        let value = whole.checked_mul(100).and_then(|v| v.checked_add(frac)).ok_or_else(err)?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// The amount as a plain decimal string without a currency symbol, e.g. `33.99`.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
