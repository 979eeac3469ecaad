//! The cart mapping and its persisted form.
//!
//! A [`Cart`] maps each [`ItemId`] to its [`CartItem`]. Entries keep the
//! order in which they were first added; that order is what the storefront
//! shows. The JSON form is an object keyed by item id:
//!
//! ```json
//! {"p1": {"id": "p1", "name": "Shirt", "price": 25000, "qty": 1, "img": "x.jpg"}}
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::types::{ItemId, Price, Quantity};

/// Errors reading or writing the persisted cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// The text is not a cart (bad JSON, zero quantity, missing fields...).
    #[error("malformed cart: {0}")]
    Malformed(#[from] serde_json::Error),

    /// An entry is stored under a key that is not its own id.
    #[error("cart key {key:?} does not match item id {id:?}")]
    KeyMismatch {
        /// Map key the entry was stored under.
        key: String,
        /// Id recorded inside the entry.
        id: String,
    },
}

/// What a product card hands to the cart when "add" is clicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ItemId,
    pub name: String,
    pub price: Price,
    pub img: String,
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ItemId,
    pub name: String,
    pub price: Price,
    pub qty: Quantity,
    #[serde(default)]
    pub img: String,
}

impl CartItem {
    /// A fresh line for `product` with a quantity of one.
    #[must_use]
    pub fn from_product(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            qty: Quantity::ONE,
            img: product.img,
        }
    }

    /// `price * qty` for this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.qty)
    }
}

/// Result of applying a quantity delta to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QtyChange {
    /// No line with that id; nothing happened.
    Absent,
    /// The line now has this quantity.
    Updated(Quantity),
    /// The quantity reached zero or below and the line was dropped.
    Removed,
}

/// The shopping cart: item id to line item, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "IndexMap<ItemId, CartItem>")]
pub struct Cart {
    items: IndexMap<ItemId, CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Malformed`] if the text is not a valid cart,
    /// including entries with a zero quantity or a key that differs from
    /// the entry's id.
    pub fn from_json(text: &str) -> Result<Self, CartError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> Result<String, CartError> {
        Ok(serde_json::to_string(self)?)
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&CartItem> {
        self.items.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Lines in display order.
    pub fn items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.values()
    }

    /// Total number of units across all lines (`sum(qty)`).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.values().map(|item| u64::from(item.qty.get())).sum()
    }

    /// Cart total (`sum(price * qty)`).
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.values().map(CartItem::line_total).sum()
    }

    /// Add one unit of `product`.
    ///
    /// An existing line keeps its name, price and image; only its quantity
    /// goes up. Returns the line's new quantity.
    pub fn add(&mut self, product: Product) -> Quantity {
        if let Some(existing) = self.items.get_mut(&product.id) {
            existing.qty = existing.qty.incremented();
            return existing.qty;
        }

        let item = CartItem::from_product(product);
        let qty = item.qty;
        self.items.insert(item.id.clone(), item);
        qty
    }

    /// Remove the line for `id`, returning it if it existed.
    pub fn remove(&mut self, id: &ItemId) -> Option<CartItem> {
        self.items.shift_remove(id)
    }

    /// Apply `delta` to the quantity of `id`, dropping the line at zero.
    pub fn change_qty(&mut self, id: &ItemId, delta: i64) -> QtyChange {
        let Some(item) = self.items.get_mut(id) else {
            return QtyChange::Absent;
        };

        match item.qty.offset(delta) {
            Some(qty) => {
                item.qty = qty;
                QtyChange::Updated(qty)
            }
            None => {
                self.items.shift_remove(id);
                QtyChange::Removed
            }
        }
    }
}

impl Serialize for Cart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl TryFrom<IndexMap<ItemId, CartItem>> for Cart {
    type Error = CartError;

    fn try_from(items: IndexMap<ItemId, CartItem>) -> Result<Self, Self::Error> {
        if let Some((key, item)) = items.iter().find(|(key, item)| **key != item.id) {
            return Err(CartError::KeyMismatch {
                key: key.to_string(),
                id: item.id.to_string(),
            });
        }
        Ok(Self { items })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str, price: u64, img: &str) -> Product {
        Product {
            id: ItemId::parse(id).unwrap(),
            name: name.to_string(),
            price: Price::new(price),
            img: img.to_string(),
        }
    }

    fn id(s: &str) -> ItemId {
        ItemId::parse(s).unwrap()
    }

    #[test]
    fn test_add_new_item_starts_at_one() {
        let mut cart = Cart::new();
        let qty = cart.add(product("p1", "Shirt", 25_000, "x.jpg"));

        assert_eq!(qty, Quantity::ONE);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total(), Price::new(25_000));
    }

    #[test]
    fn test_add_existing_keeps_first_seen_attributes() {
        let mut cart = Cart::new();
        cart.add(product("p1", "Shirt", 25_000, "x.jpg"));
        cart.add(product("p1", "Renamed", 1, "y.jpg"));
        cart.add(product("p1", "Again", 2, "z.jpg"));

        let item = cart.get(&id("p1")).unwrap();
        assert_eq!(item.qty.get(), 3);
        assert_eq!(item.name, "Shirt");
        assert_eq!(item.price, Price::new(25_000));
        assert_eq!(item.img, "x.jpg");
    }

    #[test]
    fn test_change_qty_to_zero_removes() {
        let mut cart = Cart::new();
        cart.add(product("p1", "Shirt", 25_000, "x.jpg"));
        cart.add(product("p1", "Shirt", 25_000, "x.jpg"));

        assert_eq!(cart.change_qty(&id("p1"), -2), QtyChange::Removed);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_change_qty_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add(product("p1", "Shirt", 25_000, "x.jpg"));
        let before = cart.clone();

        assert_eq!(cart.change_qty(&id("nope"), 5), QtyChange::Absent);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_preserves_order_of_the_rest() {
        let mut cart = Cart::new();
        cart.add(product("a", "A", 1, ""));
        cart.add(product("b", "B", 2, ""));
        cart.add(product("c", "C", 3, ""));

        assert!(cart.remove(&id("b")).is_some());
        assert!(cart.remove(&id("b")).is_none());

        let order: Vec<&str> = cart.items().map(|item| item.id.as_str()).collect();
        assert_eq!(order, ["a", "c"]);
    }

    #[test]
    fn test_item_count_and_total() {
        let mut cart = Cart::new();
        cart.add(product("a", "A", 1_000, ""));
        cart.add(product("a", "A", 1_000, ""));
        cart.add(product("b", "B", 2_500, ""));

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), Price::new(4_500));
    }

    #[test]
    fn test_json_layout_matches_persisted_shape() {
        let mut cart = Cart::new();
        cart.add(product("p1", "Shirt", 25_000, "x.jpg"));

        let json: serde_json::Value = serde_json::from_str(&cart.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "p1": {"id": "p1", "name": "Shirt", "price": 25000, "qty": 1, "img": "x.jpg"}
            })
        );
    }

    #[test]
    fn test_json_roundtrip_keeps_order() {
        let mut cart = Cart::new();
        cart.add(product("zeta", "Z", 5, "z.jpg"));
        cart.add(product("alpha", "A", 7, "a.jpg"));
        cart.change_qty(&id("alpha"), 4);

        let parsed = Cart::from_json(&cart.to_json().unwrap()).unwrap();
        assert_eq!(parsed, cart);

        let order: Vec<&str> = parsed.items().map(|item| item.id.as_str()).collect();
        assert_eq!(order, ["zeta", "alpha"]);
    }

    #[test]
    fn test_from_json_rejects_key_mismatch() {
        let text = r#"{"p1": {"id": "p2", "name": "Shirt", "price": 1, "qty": 1, "img": ""}}"#;
        let err = Cart::from_json(text).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_from_json_rejects_zero_quantity() {
        let text = r#"{"p1": {"id": "p1", "name": "Shirt", "price": 1, "qty": 0, "img": ""}}"#;
        assert!(Cart::from_json(text).is_err());
    }

    #[test]
    fn test_from_json_rejects_truncated_text() {
        assert!(Cart::from_json(r#"{"p1": {"id": "p1", "na"#).is_err());
        assert!(Cart::from_json("not json").is_err());
        assert!(Cart::from_json("[]").is_err());
    }

    #[test]
    fn test_from_json_missing_img_defaults_to_empty() {
        let text = r#"{"p1": {"id": "p1", "name": "Shirt", "price": 1, "qty": 2}}"#;
        let cart = Cart::from_json(text).unwrap();
        assert_eq!(cart.get(&id("p1")).unwrap().img, "");
    }

    #[test]
    fn test_empty_object_is_empty_cart() {
        assert!(Cart::from_json("{}").unwrap().is_empty());
    }
}
