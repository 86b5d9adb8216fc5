//! # Money Module
//!
//! Provides the `Money` type for reservation prices, discounts, taxes, tips and fees.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TWO-DECIMAL FIXED POINT                                                │
//! │                                                                         │
//! │  Every amount is stored as whole cents in an i64:                       │
//! │    100.00 → 10000      7.20 → 720      0.05 → 5                        │
//! │                                                                         │
//! │  Addition and subtraction are exact. The only place a fraction of a    │
//! │  cent can appear is when a rate is applied (tax, cancellation fee),    │
//! │  and that single step rounds half-up.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use slotbook_core::money::Money;
//!
//! let price: Money = "100.00".parse().unwrap();
//! assert_eq!(price.cents(), 10000);
//!
//! let tax = Money::from_cents(9000).apply_rate_bps(800); // 8% of 90.00
//! assert_eq!(tax.cents(), 720);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;
use ts_rs::TS;

/// Basis points in a whole (1 bp = 0.0001).
pub const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// The currency itself travels next to the amount (see
/// [`PricingBreakdown`](crate::pricing::PricingBreakdown)); `Money` only carries
/// the magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use slotbook_core::money::Money;
    ///
    /// let price = Money::from_cents(4550); // 45.50
    /// assert_eq!(price.cents(), 4550);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use slotbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(97, 20).cents(), 9720);
    /// ```
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

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
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
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Addition that returns `None` instead of overflowing.
    ///
    /// ## Example
    /// ```rust
    /// use slotbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1).checked_add(Money::from_cents(2)), Some(Money::from_cents(3)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
    /// ```
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Applies a rate expressed in basis points, rounding half-up.
    ///
    /// ## Rounding
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  ROUND HALF-UP (away from zero at exactly .5 of a cent)             │
    /// │                                                                     │
    /// │  90.00 × 8.00%  = 7.2000  → 7.20                                    │
    /// │  10.00 × 8.25%  = 0.8250  → 0.83                                    │
    /// │  10.10 × 8.25%  = 0.83325 → 0.83                                    │
    /// │                                                                     │
    /// │  This is the ONLY rounding step in a pricing computation.           │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Implementation
    /// Integer math in i128: `(|amount| * bps + 5000) / 10000`, sign restored
    /// afterwards so negative amounts round symmetrically.
    ///
    /// ## Example
    /// ```rust
    /// use slotbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1000).apply_rate_bps(825).cents(), 83);
    /// ```
    pub fn apply_rate_bps(&self, bps: u32) -> Money {
        let magnitude = (self.0 as i128).abs() * bps as i128;
        let rounded = (magnitude + BPS_SCALE / 2) / BPS_SCALE;
        let signed = if self.0 < 0 { -rounded } else { rounded };
        Money(signed as i64)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Error returned when a decimal amount string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount '{0}': expected a decimal with at most two fraction digits")]
pub struct ParseMoneyError(pub String);

/// Parses `"100"`, `"100.5"` and `"100.50"` style amounts.
///
/// More than two fraction digits is rejected rather than rounded: amounts
/// entering the system are already in cents.
impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let err = || ParseMoneyError(s.to_string());

        let (negative, unsigned) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let (major_str, minor_str) = match unsigned.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (unsigned, ""),
        };

        if major_str.is_empty()
            || minor_str.len() > 2
            || !major_str.chars().all(|c| c.is_ascii_digit())
            || !minor_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(err());
        }

        let major: i64 = major_str.parse().map_err(|_| err())?;
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().map_err(|_| err())? * 10,
            _ => minor_str.parse().map_err(|_| err())?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(err)?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain two-decimal rendering, e.g. `97.20`. Currency symbols are the
/// presentation layer's business.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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

// =============================================================================
// Unit Tests
// =============================================================================
