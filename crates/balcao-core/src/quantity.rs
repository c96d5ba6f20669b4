//! # Quantity Module
//!
//! Stock and cart quantities in integer milli-units.
//!
//! Unit-counted goods use whole units (2 cans = 2000 milli). Weighted
//! goods use grams (1.5 kg = 1500 milli). Same integer discipline as
//! [`Money`](crate::money::Money): floats never touch a stored quantity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// A quantity in milli-units (1000 = one unit, or one kilogram).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * 1000)
    }

    /// Creates a quantity from milli-units (grams for weighted goods).
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Returns the value in milli-units.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated).
    #[inline]
    pub const fn whole_units(&self) -> i64 {
        self.0 / 1000
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Subtraction floored at zero.
    ///
    /// The stock-clamp primitive: decrementing below available stock
    /// lands on zero, never negative.
    #[inline]
    pub fn saturating_sub(self, other: Quantity) -> Quantity {
        Quantity((self.0 - other.0).max(0))
    }
}

/// Displays "2" for whole quantities, "1.500" for fractional ones.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 1000 == 0 {
            write!(f, "{}", self.0 / 1000)
        } else {
            write!(f, "{}.{:03}", self.0 / 1000, (self.0 % 1000).abs())
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_and_milli() {
        assert_eq!(Quantity::from_units(2).milli(), 2000);
        assert_eq!(Quantity::from_milli(1500).whole_units(), 1);
    }

    #[test]
    fn test_saturating_sub() {
        let stock = Quantity::from_units(3);
        assert_eq!(stock.saturating_sub(Quantity::from_units(2)).milli(), 1000);
        assert_eq!(stock.saturating_sub(Quantity::from_units(5)).milli(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Quantity::from_units(2)), "2");
        assert_eq!(format!("{}", Quantity::from_milli(1500)), "1.500");
        assert_eq!(format!("{}", Quantity::zero()), "0");
    }

    #[test]
    fn test_ordering() {
        assert!(Quantity::from_units(2) > Quantity::from_milli(1999));
    }
}
