//! # Money Module
//!
//! Provides the `Money` type for every amount the register touches.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TWO-DECIMAL AMOUNTS WITHOUT FLOATS                                     │
//! │                                                                         │
//! │  Cart lines, discounts, shipping, tendered cash and drawer counts are   │
//! │  all stored in the smallest currency unit (céntimos).                   │
//! │                                                                         │
//! │    25.00 × 2        = 2500 × 2      = 5000                               │
//! │    50.00 − 60.00    = 5000 − 6000   = −1000  → change 10.00             │
//! │                                                                         │
//! │  Every intermediate value is already rounded to 2 decimals, so a total │
//! │  can never drift from the sum of its parts.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kiosko_core::money::Money;
//!
//! let unit = Money::from_cents(2500);           // 25.00
//! let line = unit.multiply_quantity(2);         // 50.00
//! let paid: Money = "60.00".parse().unwrap();
//! assert_eq!((paid - line).cents(), 1000);      // 10.00 change
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// - **i64 (signed)**: cash-count differences are negative when the drawer is short
/// - **Single field tuple struct**: zero-cost wrapper over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use kiosko_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use kiosko_core::money::Money;
    ///
    /// let line_total = Money::from_cents(299).multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Subtracts `other`, flooring the result at zero.
    ///
    /// Used for change and pending amounts, which are never negative.
    ///
    /// ```rust
    /// use kiosko_core::money::Money;
    ///
    /// let paid = Money::from_cents(4000);
    /// let total = Money::from_cents(5000);
    /// assert_eq!(paid.saturating_sub(total), Money::zero());
    /// assert_eq!(total.saturating_sub(paid).cents(), 1000);
    /// ```
    #[inline]
    pub fn saturating_sub(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// `self + other`, or `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Clamps the value into `[min, max]`.
    #[inline]
    pub fn clamp_between(self, min: Money, max: Money) -> Money {
        Money(self.0.max(min.0).min(max.0.max(min.0)))
    }

    /// Splits a tax-inclusive amount into its taxable base and tax portion.
    ///
    /// Shelf prices include VAT, so the tax is extracted rather than added:
    /// `base = round(amount / (1 + rate))`, `tax = amount - base`.
    ///
    /// ```rust
    /// use kiosko_core::money::Money;
    /// use kiosko_core::types::TaxRate;
    ///
    /// let (base, vat) = Money::from_cents(11800).split_inclusive_tax(TaxRate::from_bps(1800));
    /// assert_eq!(base.cents(), 10000);
    /// assert_eq!(vat.cents(), 1800);
    /// ```
    pub fn split_inclusive_tax(&self, rate: TaxRate) -> (Money, Money) {
        let divisor = 10_000_i128 + rate.bps() as i128;
        let scaled = self.0 as i128 * 10_000;
        // Round half away from zero on the base.
        let base = if scaled >= 0 {
            (scaled + divisor / 2) / divisor
        } else {
            (scaled - divisor / 2) / divisor
        };
        let base = Money(base as i64);
        (base, *self - base)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses amounts typed at the register: `"25"`, `"25.5"`, `"25.50"`, `"-3.10"`.
///
/// More than two decimals is rejected instead of silently rounded.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if digits.is_empty() {
            return Err(ValidationError::Required {
                field: "amount".to_string(),
            });
        }

        let (major_str, minor_str) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };
        if minor_str.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if major_str.is_empty() || !all_digits(major_str) || !all_digits(minor_str) {
            return Err(invalid("expected a decimal number such as 25.00"));
        }

        let major: i64 = major_str
            .parse()
            .map_err(|_| invalid("amount is too large"))?;
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().map_err(|_| invalid("bad decimals"))? * 10,
            _ => minor_str.parse().map_err(|_| invalid("bad decimals"))?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("amount is too large"))?;
        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain two-decimal rendering; the currency symbol is a display concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-5500).to_string(), "-55.00");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_parse() {
        assert_eq!("25".parse::<Money>().unwrap().cents(), 2500);
        assert_eq!("25.5".parse::<Money>().unwrap().cents(), 2550);
        assert_eq!("25.05".parse::<Money>().unwrap().cents(), 2505);
        assert_eq!("-3.10".parse::<Money>().unwrap().cents(), -310);
        assert_eq!(" 0.99 ".parse::<Money>().unwrap().cents(), 99);

        assert!("".parse::<Money>().is_err());
        assert!("1.999".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(".50".parse::<Money>().is_err());
        assert!("1,50".parse::<Money>().is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);

        assert_eq!(a.checked_add(b), Some(Money::from_cents(1500)));
        assert_eq!(Money::from_cents(i64::MAX).checked_add(b), None);
    }

    #[test]
    fn test_saturating_sub_and_clamp() {
        let paid = Money::from_cents(6000);
        let total = Money::from_cents(5000);
        assert_eq!(paid.saturating_sub(total).cents(), 1000);
        assert_eq!(total.saturating_sub(paid), Money::zero());

        let max = Money::from_cents(300);
        assert_eq!(Money::from_cents(500).clamp_between(Money::zero(), max), max);
        assert_eq!(
            Money::from_cents(-1).clamp_between(Money::zero(), max),
            Money::zero()
        );
    }

    #[test]
    fn test_split_inclusive_tax() {
        let rate = TaxRate::from_bps(1800);

        let (base, vat) = Money::from_cents(5000).split_inclusive_tax(rate);
        // 50.00 / 1.18 = 42.372... → 42.37
        assert_eq!(base.cents(), 4237);
        assert_eq!(vat.cents(), 763);
        assert_eq!(base + vat, Money::from_cents(5000));

        let (base, vat) = Money::zero().split_inclusive_tax(rate);
        assert!(base.is_zero() && vat.is_zero());
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-550).abs().cents(), 550);
    }
}
