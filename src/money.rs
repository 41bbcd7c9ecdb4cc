//! Fixed-scale monetary amount.
//!
//! Wraps `rust_decimal` with scale enforcement so tolerance comparisons
//! never go through floating point. Amounts keep four fractional digits
//! internally and render with two.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

/// A signed currency amount with exactly 4 decimal places of precision.
///
/// Sums and differences saturate at the representable range.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use charge_recon::Money;
///
/// let amount = Money::from_str("80.5").unwrap();
/// assert_eq!(amount.to_string(), "80.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Number of fractional digits kept internally.
    pub const SCALE: u32 = 4;

    /// Number of fractional digits used for display.
    pub const DISPLAY_SCALE: u32 = 2;

    pub const ZERO: Self = Money(Decimal::ZERO);

    /// One cent, the default matching and mismatch tolerance.
    pub const CENT: Self = Money(Decimal::from_parts(100, 0, 0, false, 4));

    /// Creates a new `Money` from a `Decimal`, normalizing to 4 decimal places.
    pub fn new(value: Decimal) -> Self {
        let mut normalized = value;
        normalized.rescale(Self::SCALE);
        Money(normalized)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    /// Absolute distance between two amounts.
    pub fn distance(self, other: Self) -> Self {
        (self - other).abs()
    }

    /// `true` when `self` and `other` differ by no more than `tolerance`.
    ///
    /// A difference too large to represent is never within tolerance.
    pub fn within(self, other: Self, tolerance: Self) -> bool {
        match self.0.checked_sub(other.0) {
            Some(delta) => delta.abs() <= tolerance.0,
            None => false,
        }
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())?;
        let money = Money::new(decimal);
        // Too large to carry SCALE fractional digits; rescale leaves it short.
        if money.0.scale() != Self::SCALE {
            return Err(if decimal.is_sign_negative() {
                rust_decimal::Error::LessThanMinimumPossibleValue
            } else {
                rust_decimal::Error::ExceedsMaximumPossibleValue
            });
        }
        Ok(money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0.round_dp(Self::DISPLAY_SCALE))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Money::new(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Money::new(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::from_str(&s).map_err(serde::de::Error::custom)
    }
}
