//! Fixed-point money type
//!
//! Every monetary column (prices, totals, payments, cash movements) flows through
//! [`Money`]. It wraps a [`Decimal`] that is always rounded to two fractional digits,
//! serializes as a plain JSON number and accepts either a number or a numeric string.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DomainError, DomainResult};

/// Number of fractional digits kept for every amount.
pub const MONEY_SCALE: u32 = 2;

/// A two-decimal monetary amount in the store's single local currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Largest amount a `NUMERIC(15,2)` column holds: 9999999999999.99.
    pub const MAX: Money = Money(Decimal::from_parts(
        0xA4C6_7FFF,
        0x0003_8D7E,
        0,
        false,
        MONEY_SCALE,
    ));

    /// Wrap a decimal, rounding half away from zero to two digits.
    pub fn new(value: Decimal) -> Self {
        Money(value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Build an amount from minor units (hundredths).
    pub fn from_minor(minor: i64) -> Self {
        Money(Decimal::new(minor, MONEY_SCALE))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Money {
        Money(self.0.abs())
    }

    /// `self - other`, floored at zero.
    pub fn saturating_sub(self, other: Money) -> Money {
        if other >= self {
            Money::ZERO
        } else {
            self - other
        }
    }

    /// Price of `qty` units at this unit price.
    ///
    /// Only for amounts already held in storage; request input goes through
    /// [`Money::checked_times`].
    pub fn times(self, qty: i64) -> Money {
        Money::new(self.0 * Decimal::from(qty))
    }

    /// Refuse an amount the money columns cannot hold.
    pub fn ensure_storable(self, field: &str) -> DomainResult<Money> {
        if self.abs() > Money::MAX {
            return Err(DomainError::Validation(format!(
                "{} {} exceeds the maximum amount {}",
                field,
                self,
                Money::MAX
            )));
        }
        Ok(self)
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(amount_overflow)?
            .ensure_storable("total")
    }

    pub fn checked_times(self, qty: i64) -> DomainResult<Money> {
        self.0
            .checked_mul(Decimal::from(qty))
            .map(Money::new)
            .ok_or_else(amount_overflow)?
            .ensure_storable("line total")
    }

    /// Sum that fails instead of overflowing or leaving the column range.
    pub fn checked_sum<I>(amounts: I) -> DomainResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

fn amount_overflow() -> DomainError {
    DomainError::Validation(format!("amount exceeds the maximum amount {}", Money::MAX))
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::new(value)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Money(Decimal::from(value))
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money::new)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        self.times(rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        rust_decimal::serde::float::deserialize(deserializer).map(Money::new)
    }
}
