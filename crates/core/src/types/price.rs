//! Whole-unit Ugandan shilling amounts and their display format.

use core::fmt;
use core::iter::Sum;

use serde::{Deserialize, Serialize};

use super::Quantity;

/// Currency label printed in front of every formatted amount.
pub const CURRENCY_LABEL: &str = "UGX";

/// A price in whole Ugandan shillings.
///
/// The shilling has no minor unit in practice, so amounts are plain integers
/// and there is no decimal handling anywhere in the cart.
///
/// ```
/// use bml_core::Price;
///
/// assert_eq!(Price::new(25_000).to_string(), "UGX 25,000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// Zero shillings.
    pub const ZERO: Self = Self(0);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// Get the amount in shillings.
    #[must_use]
    pub const fn amount(&self) -> u64 {
        self.0
    }

    /// Price of `qty` units, saturating at `u64::MAX`.
    #[must_use]
    pub fn times(self, qty: Quantity) -> Self {
        Self(self.0.saturating_mul(u64::from(qty.get())))
    }

    /// Sum of two prices, saturating at `u64::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CURRENCY_LABEL} {}", group_thousands(self.0))
    }
}

impl From<u64> for Price {
    fn from(amount: u64) -> Self {
        Self(amount)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

/// Group the decimal digits of `n` in runs of three from the right, joined
/// with commas.
///
/// ```
/// use bml_core::group_thousands;
///
/// assert_eq!(group_thousands(0), "0");
/// assert_eq!(group_thousands(999), "999");
/// assert_eq!(group_thousands(1_000), "1,000");
/// assert_eq!(group_thousands(1_234_567), "1,234,567");
/// ```
#[must_use]
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);

    for (i, ch) in digits.chars().enumerate() {
        // Never before the first digit.
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}
