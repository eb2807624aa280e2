//! Flat integer amounts and line-item quantities.
//!
//! The marketplace has a single currency and no fractional units, so a price
//! is a plain non-negative integer. Totals are computed from snapshotted unit
//! prices and saturate at `i64::MAX` instead of wrapping.

use core::fmt;
use std::iter::Sum;

use serde::{Deserialize, Serialize};

/// A non-negative amount in the marketplace currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Price(i64);

impl Price {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Create a price, rejecting negative amounts.
    #[must_use]
    pub const fn new(amount: i64) -> Option<Self> {
        if amount < 0 { None } else { Some(Self(amount)) }
    }

    /// Get the underlying amount.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// `self × quantity`, saturating.
    #[must_use]
    pub const fn line_total(self, quantity: Quantity) -> Self {
        Self(self.0.saturating_mul(quantity.get() as i64))
    }

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl TryFrom<i64> for Price {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("price cannot be negative (got {value})"))
    }
}

impl From<Price> for i64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of units on an order line. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// Create a quantity from any integer, rejecting values below one or
    /// above `i32::MAX`.
    #[must_use]
    pub fn new(value: i64) -> Option<Self> {
        i32::try_from(value).ok().filter(|v| *v >= 1).map(Self)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Quantity {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
            .ok_or_else(|| format!("quantity must be at least 1 (got {value})"))
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "postgres")]
mod pg {
    use super::{Price, Quantity};

    impl sqlx::Type<sqlx::Postgres> for Price {
        fn type_info() -> sqlx::postgres::PgTypeInfo {
            <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
        }

        fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
            <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
        }
    }

    impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
        fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
            let amount = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
            Ok(Self::try_from(amount)?)
        }
    }

    impl sqlx::Encode<'_, sqlx::Postgres> for Price {
        fn encode_by_ref(
            &self,
            buf: &mut sqlx::postgres::PgArgumentBuffer,
        ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
            <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
        }
    }

    impl sqlx::Type<sqlx::Postgres> for Quantity {
        fn type_info() -> sqlx::postgres::PgTypeInfo {
            <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
        }

        fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
            <i32 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
        }
    }

    impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Quantity {
        fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
            let quantity = <i32 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
            Ok(Self::try_from(quantity)?)
        }
    }

    impl sqlx::Encode<'_, sqlx::Postgres> for Quantity {
        fn encode_by_ref(
            &self,
            buf: &mut sqlx::postgres::PgArgumentBuffer,
        ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
            <i32 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_price_rejects_negative() {
        assert!(Price::new(-1).is_none());
        assert_eq!(Price::new(0), Some(Price::ZERO));
        assert!(serde_json::from_str::<Price>("-5").is_err());
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(Quantity::new(0).is_none());
        assert!(Quantity::new(-2).is_none());
        assert!(Quantity::new(i64::from(i32::MAX) + 1).is_none());
        assert_eq!(Quantity::new(3).unwrap().get(), 3);
    }

    #[test]
    fn test_line_total_and_sum() {
        let a = Price::new(100).unwrap().line_total(Quantity::new(2).unwrap());
        let b = Price::new(50).unwrap().line_total(Quantity::new(1).unwrap());
        let total: Price = [a, b].into_iter().sum();
        assert_eq!(total.amount(), 250);
    }

    #[test]
    fn test_line_total_saturates() {
        let huge = Price::new(i64::MAX / 2).unwrap();
        let total = huge.line_total(Quantity::new(3).unwrap());
        assert_eq!(total.amount(), i64::MAX);
    }
}
