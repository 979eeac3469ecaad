//! BML Core - Cart model and cart store.
//!
//! This crate holds everything about the shopping cart that does not depend
//! on HTTP or HTML:
//! - `types` - Newtypes for item IDs, prices and quantities
//! - `cart` - The cart mapping and its persisted JSON form
//! - `store` - The cart store: load/save/mutate against a repository
//!
//! # Architecture
//!
//! The store never caches cart state. Every operation reads the persisted
//! blob from a [`store::CartRepository`], applies the change and writes the
//! full blob back. Observers registered with [`store::CartStore::subscribe`]
//! receive a [`store::CartEvent`] after each successful mutation, which is how
//! the storefront keeps its rendered sinks in step.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod store;
pub mod types;

pub use cart::{Cart, CartError, CartItem, Product, QtyChange};
pub use store::{
    CartEvent, CartObserver, CartRepository, CartStore, CheckoutOutcome, MemoryRepository,
    RepositoryError, STORAGE_KEY, StoreError,
};
pub use types::*;
