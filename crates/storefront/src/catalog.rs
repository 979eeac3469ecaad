//! Product catalog shown on the shop page.
//!
//! Loaded once at startup from a JSON array:
//!
//! ```json
//! [{"id": "p1", "name": "Kitenge Shirt", "price": 25000, "img": "/static/images/product1.svg"}]
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use bml_core::{ItemId, Product};
use thiserror::Error;

/// Errors loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate product id in catalog: {0}")]
    DuplicateId(ItemId),
}

/// The products on sale, in display order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Arc<Vec<Product>>,
}

impl Catalog {
    /// Load the catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a product array,
    /// or repeats an id.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&text)?;
        tracing::info!(products = catalog.len(), "Loaded catalog from {:?}", path);
        Ok(catalog)
    }

    /// Parse a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a product array or repeats an id.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let products: Vec<Product> = serde_json::from_str(text)?;
        Self::new(products)
    }

    /// Build a catalog from products.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateId`] if two products share an id.
    pub fn new(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for product in &products {
            if !seen.insert(&product.id) {
                return Err(CatalogError::DuplicateId(product.id.clone()));
            }
        }

        Ok(Self {
            products: Arc::new(products),
        })
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TWO_PRODUCTS: &str = r#"[
        {"id": "p1", "name": "Shirt", "price": 25000, "img": "/static/images/product1.svg"},
        {"id": "p2", "name": "Basket", "price": 40000, "img": "/static/images/product2.svg"}
    ]"#;

    #[test]
    fn test_from_json_keeps_order() {
        let catalog = Catalog::from_json(TWO_PRODUCTS).unwrap();
        let ids: Vec<&str> = catalog.products().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p1", "p2"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let text = r#"[
            {"id": "p1", "name": "A", "price": 1, "img": ""},
            {"id": "p1", "name": "B", "price": 2, "img": ""}
        ]"#;
        assert!(matches!(
            Catalog::from_json(text),
            Err(CatalogError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_negative_price_rejected() {
        let text = r#"[{"id": "p1", "name": "A", "price": -1, "img": ""}]"#;
        assert!(matches!(
            Catalog::from_json(text),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Catalog::load(Path::new("/nonexistent/products.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn test_bundled_catalog_parses() {
        let text = include_str!("../content/products.json");
        let catalog = Catalog::from_json(text).unwrap();
        assert!(!catalog.is_empty());
    }
}
