//! The cart store.
//!
//! [`CartStore`] is the only thing that reads or writes cart state. It keeps
//! nothing in memory between calls: each operation loads the persisted blob
//! from its [`CartRepository`], applies one change, and writes the whole cart
//! back under [`STORAGE_KEY`]. After a successful mutation it broadcasts a
//! [`CartEvent`] to every subscribed [`CartObserver`].
//!
//! # Example
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use bml_core::{CartStore, ItemId, MemoryRepository, Price, Product};
//!
//! let store = CartStore::new(MemoryRepository::new());
//! store
//!     .add(Product {
//!         id: ItemId::parse("p1").unwrap(),
//!         name: "Shirt".into(),
//!         price: Price::new(25_000),
//!         img: "x.jpg".into(),
//!     })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(store.load().await.total().to_string(), "UGX 25,000");
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::instrument;

use crate::cart::{Cart, CartError, Product, QtyChange};
use crate::types::{ItemId, Price, Quantity};

/// Key the cart blob is persisted under. The suffix is the schema generation.
pub const STORAGE_KEY: &str = "bml_cart_v1";

/// Error from a repository backend.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Error from a store mutation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing the cart back failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The cart could not be serialized.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Durable key-value storage for the cart blob.
///
/// Values are opaque text; the store owns the format.
pub trait CartRepository: Send + Sync {
    /// Read the value under `key`, if any.
    fn read(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, RepositoryError>> + Send;

    /// Overwrite the value under `key`.
    fn write(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// In-process repository backed by a `HashMap`.
///
/// Used as a test double and for tooling that has no session to write to.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository that already holds `value` under `key`.
    #[must_use]
    pub fn with_value(key: &str, value: impl Into<String>) -> Self {
        let mut values = HashMap::new();
        values.insert(key.to_owned(), value.into());
        Self {
            values: Mutex::new(values),
        }
    }

    /// Current raw value under `key`.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, RepositoryError> {
        self.values
            .lock()
            .map_err(|_| RepositoryError::Backend("memory repository lock poisoned".to_string()))
    }
}

impl CartRepository for MemoryRepository {
    async fn read(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> Result<(), RepositoryError> {
        self.lock()?.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Notification published by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEvent {
    /// The total unit count was (re)published. Emitted on every save.
    CountChanged { count: u64 },
    /// Cart contents changed; anything showing them should re-render.
    Changed,
}

/// Receives [`CartEvent`]s from a [`CartStore`].
pub trait CartObserver: Send + Sync {
    fn notify(&self, event: &CartEvent);
}

impl<F> CartObserver for F
where
    F: Fn(&CartEvent) + Send + Sync,
{
    fn notify(&self, event: &CartEvent) {
        self(event);
    }
}

/// Result of the mock checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Nothing to check out; state untouched.
    Empty,
    /// The cart held `item_count` units worth `total` and has been cleared.
    Completed { total: Price, item_count: u64 },
}

/// Reads, mutates and persists the cart.
pub struct CartStore<R> {
    repo: R,
    key: String,
    observers: Vec<Arc<dyn CartObserver>>,
}

impl<R> std::fmt::Debug for CartStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.key)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<R: CartRepository> CartStore<R> {
    /// A store persisting under [`STORAGE_KEY`].
    #[must_use]
    pub fn new(repo: R) -> Self {
        Self::with_key(repo, STORAGE_KEY)
    }

    /// A store persisting under a custom key.
    #[must_use]
    pub fn with_key(repo: R, key: impl Into<String>) -> Self {
        Self {
            repo,
            key: key.into(),
            observers: Vec::new(),
        }
    }

    /// Register an observer. Events go to observers in registration order.
    pub fn subscribe(&mut self, observer: Arc<dyn CartObserver>) {
        self.observers.push(observer);
    }

    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repo
    }

    /// Read the current cart.
    ///
    /// Missing state is an empty cart. Unreadable or malformed state is
    /// logged and also treated as an empty cart; this never fails.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn load(&self) -> Cart {
        let raw = match self.repo.read(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Cart::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cart from storage");
                return Cart::new();
            }
        };

        Cart::from_json(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to parse cart from storage");
            Cart::new()
        })
    }

    /// Overwrite the persisted cart and publish the new unit count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the cart cannot be serialized or written.
    #[instrument(skip(self, cart), fields(key = %self.key, lines = cart.len()))]
    pub async fn save(&self, cart: &Cart) -> Result<(), StoreError> {
        let text = cart.to_json()?;
        self.repo.write(&self.key, text).await?;
        self.publish(&CartEvent::CountChanged {
            count: cart.item_count(),
        });
        Ok(())
    }

    /// Add one unit of `product`. First-seen name, price and image win.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the cart cannot be written back.
    #[instrument(skip(self, product), fields(item_id = %product.id))]
    pub async fn add(&self, product: Product) -> Result<Quantity, StoreError> {
        let mut cart = self.load().await;
        let qty = cart.add(product);
        self.save(&cart).await?;
        self.publish(&CartEvent::Changed);
        tracing::debug!(qty = qty.get(), "Added item to cart");
        Ok(qty)
    }

    /// Remove the line for `id`.
    ///
    /// Returns `false` (and writes nothing) if there was no such line.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the cart cannot be written back.
    #[instrument(skip(self, id), fields(item_id = %id))]
    pub async fn remove(&self, id: &ItemId) -> Result<bool, StoreError> {
        let mut cart = self.load().await;
        if cart.remove(id).is_none() {
            return Ok(false);
        }
        self.save(&cart).await?;
        self.publish(&CartEvent::Changed);
        Ok(true)
    }

    /// Add `delta` to the quantity of `id`; at zero or below the line is
    /// removed rather than kept at zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the cart cannot be written back.
    #[instrument(skip(self, id), fields(item_id = %id))]
    pub async fn change_qty(&self, id: &ItemId, delta: i64) -> Result<QtyChange, StoreError> {
        let mut cart = self.load().await;
        let change = cart.change_qty(id, delta);
        if change == QtyChange::Absent {
            return Ok(change);
        }
        self.save(&cart).await?;
        self.publish(&CartEvent::Changed);
        Ok(change)
    }

    /// Reset the cart to empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the persisted cart cannot be removed.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.repo.delete(&self.key).await?;
        self.publish(&CartEvent::Changed);
        self.publish(&CartEvent::CountChanged { count: 0 });
        Ok(())
    }

    /// Mock checkout: clear a non-empty cart and report what it held.
    ///
    /// No order is placed anywhere.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the cart cannot be cleared.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn checkout(&self) -> Result<CheckoutOutcome, StoreError> {
        let cart = self.load().await;
        if cart.is_empty() {
            return Ok(CheckoutOutcome::Empty);
        }

        let outcome = CheckoutOutcome::Completed {
            total: cart.total(),
            item_count: cart.item_count(),
        };
        self.clear().await?;
        tracing::info!(total = %cart.total(), "Mock checkout completed");
        Ok(outcome)
    }

    fn publish(&self, event: &CartEvent) {
        for observer in &self.observers {
            observer.notify(event);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Records every event it sees.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<CartEvent>>);

    impl Recorder {
        fn events(&self) -> Vec<CartEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    impl CartObserver for Recorder {
        fn notify(&self, event: &CartEvent) {
            self.0.lock().unwrap().push(*event);
        }
    }

    /// Repository whose writes always fail.
    struct BrokenRepository;

    impl CartRepository for BrokenRepository {
        async fn read(&self, _key: &str) -> Result<Option<String>, RepositoryError> {
            Err(RepositoryError::Backend("down".to_string()))
        }

        async fn write(&self, _key: &str, _value: String) -> Result<(), RepositoryError> {
            Err(RepositoryError::Backend("down".to_string()))
        }

        async fn delete(&self, _key: &str) -> Result<(), RepositoryError> {
            Err(RepositoryError::Backend("down".to_string()))
        }
    }

    fn shirt() -> Product {
        Product {
            id: ItemId::parse("p1").unwrap(),
            name: "Shirt".to_string(),
            price: Price::new(25_000),
            img: "x.jpg".to_string(),
        }
    }

    fn p1() -> ItemId {
        ItemId::parse("p1").unwrap()
    }

    fn observed_store() -> (CartStore<MemoryRepository>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let mut store = CartStore::new(MemoryRepository::new());
        store.subscribe(recorder.clone());
        (store, recorder)
    }

    #[tokio::test]
    async fn test_load_without_state_is_empty() {
        let store = CartStore::new(MemoryRepository::new());
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed_state_is_empty() {
        let repo = MemoryRepository::with_value(STORAGE_KEY, r#"{"p1": {"id": "p1", "na"#);
        let store = CartStore::new(repo);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_read_failure_is_empty() {
        let store = CartStore::new(BrokenRepository);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_scenario_first_line() {
        let store = CartStore::new(MemoryRepository::new());
        store.add(shirt()).await.unwrap();

        let cart = store.load().await;
        let item = cart.get(&p1()).unwrap();
        assert_eq!(item.name, "Shirt");
        assert_eq!(item.price, Price::new(25_000));
        assert_eq!(item.qty, Quantity::ONE);
        assert_eq!(item.img, "x.jpg");
        assert_eq!(cart.total().to_string(), "UGX 25,000");
    }

    #[tokio::test]
    async fn test_add_twice_doubles_total() {
        let store = CartStore::new(MemoryRepository::new());
        store.add(shirt()).await.unwrap();
        let qty = store.add(shirt()).await.unwrap();

        assert_eq!(qty.get(), 2);
        assert_eq!(store.load().await.total().to_string(), "UGX 50,000");
    }

    #[tokio::test]
    async fn test_repeated_adds_keep_first_attributes() {
        let store = CartStore::new(MemoryRepository::new());
        store.add(shirt()).await.unwrap();
        for n in 0..4 {
            let mut later = shirt();
            later.name = format!("Variant {n}");
            later.price = Price::new(n);
            later.img = format!("{n}.jpg");
            store.add(later).await.unwrap();
        }

        let cart = store.load().await;
        let item = cart.get(&p1()).unwrap();
        assert_eq!(item.qty.get(), 5);
        assert_eq!(item.name, "Shirt");
        assert_eq!(item.price, Price::new(25_000));
        assert_eq!(item.img, "x.jpg");
    }

    #[tokio::test]
    async fn test_change_qty_by_minus_current_removes() {
        let (store, recorder) = observed_store();
        store.add(shirt()).await.unwrap();
        store.add(shirt()).await.unwrap();

        let change = store.change_qty(&p1(), -2).await.unwrap();

        assert_eq!(change, QtyChange::Removed);
        assert!(store.load().await.is_empty());
        assert_eq!(recorder.events().last(), Some(&CartEvent::Changed));
        assert!(
            recorder
                .events()
                .contains(&CartEvent::CountChanged { count: 0 })
        );
    }

    #[tokio::test]
    async fn test_change_qty_absent_is_silent_noop() {
        let (store, recorder) = observed_store();
        store.add(shirt()).await.unwrap();
        let before_raw = store.repository().raw(STORAGE_KEY);
        let before_events = recorder.events().len();

        let missing = ItemId::parse("missing").unwrap();
        let change = store.change_qty(&missing, 1).await.unwrap();

        assert_eq!(change, QtyChange::Absent);
        assert_eq!(store.repository().raw(STORAGE_KEY), before_raw);
        assert_eq!(recorder.events().len(), before_events);
    }

    #[tokio::test]
    async fn test_change_qty_updates() {
        let store = CartStore::new(MemoryRepository::new());
        store.add(shirt()).await.unwrap();

        let change = store.change_qty(&p1(), 3).await.unwrap();
        assert_eq!(change, QtyChange::Updated(Quantity::new(4).unwrap()));
        assert_eq!(store.load().await.item_count(), 4);
    }

    #[tokio::test]
    async fn test_remove_present_and_absent() {
        let (store, recorder) = observed_store();
        store.add(shirt()).await.unwrap();

        assert!(store.remove(&p1()).await.unwrap());
        assert!(!store.load().await.contains(&p1()));

        let events = recorder.events().len();
        let raw = store.repository().raw(STORAGE_KEY);
        assert!(!store.remove(&p1()).await.unwrap());
        assert_eq!(recorder.events().len(), events);
        assert_eq!(store.repository().raw(STORAGE_KEY), raw);
    }

    #[tokio::test]
    async fn test_clear_empties_and_publishes_zero_count() {
        let (store, recorder) = observed_store();
        store.add(shirt()).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.load().await.is_empty());
        assert!(store.repository().raw(STORAGE_KEY).is_none());
        assert_eq!(
            recorder.events().last(),
            Some(&CartEvent::CountChanged { count: 0 })
        );
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let mut cart = Cart::new();
        cart.add(shirt());
        cart.add(Product {
            id: ItemId::parse("p2").unwrap(),
            name: "Mug".to_string(),
            price: Price::new(8_000),
            img: String::new(),
        });
        cart.change_qty(&p1(), 2);

        let store = CartStore::new(MemoryRepository::new());
        store.save(&cart).await.unwrap();
        assert_eq!(store.load().await, cart);
    }

    #[tokio::test]
    async fn test_save_publishes_count() {
        let (store, recorder) = observed_store();
        store.add(shirt()).await.unwrap();
        store.add(shirt()).await.unwrap();

        assert_eq!(
            recorder.events(),
            vec![
                CartEvent::CountChanged { count: 1 },
                CartEvent::Changed,
                CartEvent::CountChanged { count: 2 },
                CartEvent::Changed,
            ]
        );
    }

    #[tokio::test]
    async fn test_closure_observer() {
        let seen = Arc::new(Mutex::new(0_u32));
        let counter = seen.clone();
        let mut store = CartStore::new(MemoryRepository::new());
        store.subscribe(Arc::new(move |_: &CartEvent| {
            *counter.lock().unwrap() += 1;
        }));

        store.add(shirt()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_checkout_empty_changes_nothing() {
        let (store, recorder) = observed_store();

        assert_eq!(store.checkout().await.unwrap(), CheckoutOutcome::Empty);
        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_reports_total_and_clears() {
        let store = CartStore::new(MemoryRepository::new());
        store.add(shirt()).await.unwrap();
        store.add(shirt()).await.unwrap();

        let outcome = store.checkout().await.unwrap();
        assert_eq!(
            outcome,
            CheckoutOutcome::Completed {
                total: Price::new(50_000),
                item_count: 2,
            }
        );
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let store = CartStore::new(BrokenRepository);
        let err = store.add(shirt()).await.unwrap_err();
        assert!(matches!(err, StoreError::Repository(_)));
    }

    #[tokio::test]
    async fn test_custom_key_is_used() {
        let store = CartStore::with_key(MemoryRepository::new(), "other_cart");
        store.add(shirt()).await.unwrap();

        assert!(store.repository().raw("other_cart").is_some());
        assert!(store.repository().raw(STORAGE_KEY).is_none());
    }
}
