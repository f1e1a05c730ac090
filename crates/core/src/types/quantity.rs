//! Purchase quantity type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a quantity is not a positive integer that fits in
/// stock arithmetic.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("quantity must be a positive integer (got {0})")]
pub struct QuantityError(pub i64);

/// A strictly positive number of units.
///
/// Constructing a `Quantity` is the only way to reach the inventory ledger,
/// so a zero or negative reservation can never touch storage.
///
/// ```
/// use tradepost_core::Quantity;
///
/// assert!(Quantity::new(3).is_ok());
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::new(-2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError` if the value is zero, negative, or larger
    /// than `i32::MAX`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        match i32::try_from(value) {
            Ok(v) if v > 0 => Ok(Self(v)),
            _ => Err(QuantityError(value)),
        }
    }

    /// The number of units.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
