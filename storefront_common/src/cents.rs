use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Cents       -----------------------------------------------------------
/// An integer amount of money, in cents. All monetary arithmetic in the engine is integer arithmetic;
/// floating point never enters the picture.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Cents {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Cents {}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CentsConversionError(format!("Value {value} is too large to convert to Cents")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_whole(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a unit count, failing instead of wrapping when the product does not fit in
    /// an `i64`.
    pub fn checked_mul(self, rhs: i64) -> Result<Self, CentsConversionError> {
        self.0
            .checked_mul(rhs)
            .map(Self)
            .ok_or_else(|| CentsConversionError(format!("{self} * {rhs} overflows")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Cents::from(1_000);
        let b = Cents::from(250);
        assert_eq!(a + b, Cents::from(1_250));
        assert_eq!(a - b, Cents::from(750));
        assert_eq!(b.checked_mul(3).unwrap(), Cents::from(750));
        assert_eq!(-b, Cents::from(-250));
        let total: Cents = [a, b, b].into_iter().sum();
        assert_eq!(total, Cents::from(1_500));
    }

    #[test]
    fn multiplication_overflow_is_an_error() {
        assert!(Cents::from(i64::MAX).checked_mul(2).is_err());
        assert!(Cents::from(i64::MIN).checked_mul(-1).is_err());
        assert_eq!(Cents::from(i64::MAX).checked_mul(1).unwrap(), Cents::from(i64::MAX));
    }

    #[test]
    fn display() {
        assert_eq!(Cents::from(40_000).to_string(), "$400.00");
        assert_eq!(Cents::from(5).to_string(), "$0.05");
        assert_eq!(Cents::from(-1_234).to_string(), "-$12.34");
    }
}
