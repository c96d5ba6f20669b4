//! # Money Module
//!
//! Monetary values in integer centavos.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  In floating point:   0.1 + 0.2 = 0.30000000000000004  ❌       │
//! │                                                                 │
//! │  In integer centavos: 10 + 20 = 30                     ✅       │
//! │                                                                 │
//! │  Every stored amount, every ledger entry, every sale total      │
//! │  flows through this type. Floats never touch a stored value.    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use balcao_core::money::Money;
//!
//! let price = Money::from_cents(1099); // R$ 10,99
//! let total = price + Money::from_cents(500);
//! assert_eq!(total.cents(), 1599);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::quantity::Quantity;

/// A monetary value in the smallest currency unit (centavos).
///
/// ## Design Decisions
/// - **i64 (signed)**: arithmetic intermediates may go negative even
///   though stored balances are clamped at zero
/// - **Single-field tuple struct**: zero-cost abstraction over i64
/// - **Serde**: serializes as a bare integer, so JSON snapshots
///   (ledger history, order items) stay compact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (reais) portion.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (centavos) portion, always 0-99.
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
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

    /// Subtraction floored at zero.
    ///
    /// This is the debt-clamp primitive: recording a payment larger than
    /// the outstanding balance yields zero, never a negative balance.
    ///
    /// ## Example
    /// ```rust
    /// use balcao_core::money::Money;
    ///
    /// let debt = Money::from_cents(3000);
    /// assert_eq!(debt.saturating_sub(Money::from_cents(5000)), Money::zero());
    /// ```
    #[inline]
    pub fn saturating_sub(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// Extends a unit price over a quantity, rounding half-up to a cent.
    ///
    /// Quantities carry milli-unit precision (1500 = 1.5 kg), so the raw
    /// product is in milli-centavos and must be rounded back:
    /// `(cents × milli + 500) / 1000`.
    ///
    /// ## Example
    /// ```rust
    /// use balcao_core::{Money, Quantity};
    ///
    /// let unit_price = Money::from_cents(899);          // R$ 8,99 per kg
    /// let half_kilo = Quantity::from_milli(500);        // 0.5 kg
    /// assert_eq!(unit_price.extend(half_kilo).cents(), 450); // rounds 449.5 up
    /// ```
    pub fn extend(&self, quantity: Quantity) -> Money {
        // i128 intermediate prevents overflow on large carts
        let raw = self.0 as i128 * quantity.milli() as i128;
        let rounded = if raw >= 0 { (raw + 500) / 1000 } else { (raw - 500) / 1000 };
        Money(rounded as i64)
    }
}

/// Display for diagnostics and log lines. UI formatting is out of scope.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}R${}.{:02}", sign, self.reais().abs(), self.cents_part())
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
    fn mul(self, n: i64) -> Self {
        Money(self.0 * n)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
