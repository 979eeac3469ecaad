//! Core types for the cart.
//!
//! This module provides type-safe wrappers for cart domain concepts.

pub mod id;
pub mod price;
pub mod quantity;

pub use id::{ItemId, ItemIdError};
pub use price::{CURRENCY_LABEL, Price, group_thousands};
pub use quantity::Quantity;
