//! Line-item quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Quantity of a cart line. Always at least one.
///
/// A line whose quantity would drop to zero or below is removed from the cart
/// instead, so there is no way to build (or deserialize) a zero quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, returning `None` for zero.
    #[must_use]
    pub const fn new(n: u32) -> Option<Self> {
        match NonZeroU32::new(n) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Get the quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Apply a signed delta.
    ///
    /// Returns `None` when the result is zero or negative, meaning the line
    /// must be removed. Results above `u32::MAX` saturate.
    #[must_use]
    pub fn offset(self, delta: i64) -> Option<Self> {
        let next = i64::from(self.get()).saturating_add(delta);
        if next <= 0 {
            return None;
        }
        let next = u32::try_from(next).unwrap_or(u32::MAX);
        Self::new(next)
    }

    /// One more unit, saturating at `u32::MAX`.
    #[must_use]
    pub const fn incremented(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
