use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const VND_CURRENCY_CODE: &str = "VND";
/// ISO 4217 numeric code for the Vietnamese dong, as used in EMV QR payloads.
pub const VND_NUMERIC_CODE: &str = "704";
/// Number of minor units in one dong.
pub const MINOR_UNITS_PER_DONG: i64 = 100;

//--------------------------------------         Vnd         ---------------------------------------------------------
/// An amount of Vietnamese dong, stored as a whole number of hundredths of a dong.
///
/// The dong has no coins in circulation, but order totals and bank statements may still carry fractional values, so
/// the extra precision lets tolerances like "within 0.01" be expressed exactly. Serialized forms (JSON, database) carry
/// the raw minor-unit value.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Vnd(i64);

op!(binary Vnd, Add, add);
op!(binary Vnd, Sub, sub);
op!(inplace Vnd, AddAssign, add_assign);
op!(inplace Vnd, SubAssign, sub_assign);
op!(unary Vnd, Neg, neg);

impl Sum for Vnd {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a Vnd> for Vnd {
    fn sum<I: Iterator<Item = &'a Vnd>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in dong: {0}")]
pub struct VndConversionError(String);

impl Display for Vnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / MINOR_UNITS_PER_DONG as u64;
        let frac = abs % MINOR_UNITS_PER_DONG as u64;
        if frac == 0 {
            write!(f, "{sign}{whole}₫")
        } else {
            write!(f, "{sign}{whole}.{frac:02}₫")
        }
    }
}

impl FromStr for Vnd {
    type Err = VndConversionError;

    /// Parses a decimal amount of dong, e.g. `"150000"` or `"150000.5"`. At most two decimal places are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() || frac.len() > 2 || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(VndConversionError(format!("'{s}' is not a valid dong amount")));
        }
        let whole = whole.parse::<i64>().map_err(|e| VndConversionError(format!("{s}: {e}")))?;
        let frac = format!("{frac:0<2}").parse::<i64>().map_err(|e| VndConversionError(format!("{s}: {e}")))?;
        let minor = whole
            .checked_mul(MINOR_UNITS_PER_DONG)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(|| VndConversionError(format!("{s} is too large")))?;
        Ok(Self(if negative { -minor } else { minor }))
    }
}

impl Vnd {
    /// Converts a whole number of dong. Only for amounts known to be in range, such as constants. Anything that came
    /// from outside the process goes through [`Vnd::checked_from_dong`].
    pub fn from_dong(dong: i64) -> Self {
        Self(dong * MINOR_UNITS_PER_DONG)
    }

    pub fn checked_from_dong(dong: i64) -> Result<Self, VndConversionError> {
        dong.checked_mul(MINOR_UNITS_PER_DONG)
            .map(Self)
            .ok_or_else(|| VndConversionError(format!("{dong} dong is too large")))
    }

    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// The raw value, in hundredths of a dong.
    pub fn minor(&self) -> i64 {
        self.0
    }

    /// The amount in whole dong, if it has no fractional part.
    pub fn whole_dong(&self) -> Option<i64> {
        (self.0 % MINOR_UNITS_PER_DONG == 0).then_some(self.0 / MINOR_UNITS_PER_DONG)
    }

    /// The price of `quantity` units at this unit price.
    pub fn checked_mul(&self, quantity: i64) -> Result<Vnd, VndConversionError> {
        self.0
            .checked_mul(quantity)
            .map(Self)
            .ok_or_else(|| VndConversionError(format!("{self} × {quantity} is too large")))
    }

    pub fn checked_add(&self, other: Vnd) -> Result<Vnd, VndConversionError> {
        self.0.checked_add(other.0).map(Self).ok_or_else(|| VndConversionError(format!("{self} + {other} is too large")))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn abs_diff(&self, other: Vnd) -> Vnd {
        Self((self.0 - other.0).abs())
    }

    /// Rounds to the nearest whole dong. Midpoints round to the even dong.
    pub fn round_to_dong(&self) -> Vnd {
        self.scale_to_dong(1, 1)
    }

    /// Multiplies the amount by `numerator / denominator` and rounds the result to the nearest whole dong, with
    /// midpoints going to the even dong. The intermediate product is computed with 128-bit precision.
    ///
    /// `denominator` must be positive.
    pub fn scale_to_dong(&self, numerator: i64, denominator: i64) -> Vnd {
        let n = i128::from(self.0) * i128::from(numerator);
        let d = i128::from(denominator) * i128::from(MINOR_UNITS_PER_DONG);
        let dong = div_round_half_even(n, d);
        #[allow(clippy::cast_possible_truncation)]
        Self(dong as i64 * MINOR_UNITS_PER_DONG)
    }
}

fn div_round_half_even(n: i128, d: i128) -> i128 {
    let q = n.div_euclid(d);
    let r = n.rem_euclid(d);
    match (2 * r).cmp(&d) {
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Equal => q + (q & 1),
    }
}
