//! Cart repository backed by the shopper's session.
//!
//! The session plays the part of the browser's local storage: one durable
//! key-value map per shopper, surviving page loads. The cart blob is stored
//! as a JSON string value under [`bml_core::STORAGE_KEY`].

use bml_core::{CartRepository, RepositoryError};
use tower_sessions::Session;

/// [`CartRepository`] over a `tower_sessions::Session`.
#[derive(Debug, Clone)]
pub struct SessionCartRepository {
    session: Session,
}

impl SessionCartRepository {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl CartRepository for SessionCartRepository {
    async fn read(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        self.session.get::<String>(key).await.map_err(backend_error)
    }

    async fn write(&self, key: &str, value: String) -> Result<(), RepositoryError> {
        self.session.insert(key, value).await.map_err(backend_error)
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        self.session
            .remove_value(key)
            .await
            .map(|_| ())
            .map_err(backend_error)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn backend_error(e: tower_sessions::session::Error) -> RepositoryError {
    RepositoryError::Backend(e.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bml_core::{CartStore, ItemId, Price, Product, STORAGE_KEY};
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn shirt() -> Product {
        Product {
            id: ItemId::parse("p1").unwrap(),
            name: "Shirt".to_string(),
            price: Price::new(25_000),
            img: "x.jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_store_persists_into_session() {
        let session = session();
        let store = CartStore::new(SessionCartRepository::new(session.clone()));

        store.add(shirt()).await.unwrap();

        let raw: String = session.get(STORAGE_KEY).await.unwrap().unwrap();
        assert!(raw.contains("\"p1\""));
        assert_eq!(store.load().await.item_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_session_key() {
        let session = session();
        let store = CartStore::new(SessionCartRepository::new(session.clone()));
        store.add(shirt()).await.unwrap();

        store.clear().await.unwrap();

        let raw: Option<String> = session.get(STORAGE_KEY).await.unwrap();
        assert!(raw.is_none());
    }

    #[tokio::test]
    async fn test_non_string_session_value_reads_as_empty_cart() {
        let session = session();
        session.insert(STORAGE_KEY, 42).await.unwrap();

        let store = CartStore::new(SessionCartRepository::new(session));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_blob_reads_as_empty_cart() {
        let session = session();
        session.insert(STORAGE_KEY, "{\"p1\": {").await.unwrap();

        let store = CartStore::new(SessionCartRepository::new(session));
        assert!(store.load().await.is_empty());
    }
}
