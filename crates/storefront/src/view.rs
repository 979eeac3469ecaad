//! Cart view: display data for templates and the event bridge to HTMX.
//!
//! Every cart sink on a page (item lists, totals, count badges, the panel) is
//! an element that re-fetches its own fragment when a named event fires on
//! `body`. [`HtmxNotifier`] subscribes to the cart store and turns store
//! events into those names, sent to the browser in one `HX-Trigger` header:
//!
//! | Store / view event        | HTMX event          | Sinks refreshed         |
//! |---------------------------|---------------------|-------------------------|
//! | `CartEvent::Changed`      | `cart-updated`      | item lists, totals      |
//! | `CartEvent::CountChanged` | `cart-count`        | count badges            |
//! | notice                    | `cart-notice`       | `alert()` in `cart.js`  |
//! | panel close               | `cart-panel-close`  | the cart panel          |
//!
//! A page without a given sink simply has nothing listening for its event.

use std::collections::BTreeMap;
use std::sync::Mutex;

use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use bml_core::{Cart, CartEvent, CartItem, CartObserver, Price, Product};

/// Response header HTMX reads client-side events from.
pub const HX_TRIGGER: &str = "hx-trigger";

pub const CART_UPDATED_EVENT: &str = "cart-updated";
pub const CART_COUNT_EVENT: &str = "cart-count";
pub const CART_NOTICE_EVENT: &str = "cart-notice";
pub const PANEL_CLOSE_EVENT: &str = "cart-panel-close";

/// Image shown for a line whose stored image URL is empty.
pub const FALLBACK_IMAGE: &str = "/static/images/placeholder.svg";

/// Notice shown when checkout is attempted on an empty cart.
pub const EMPTY_CART_NOTICE: &str = "Cart is empty";

/// Notice shown by the mock checkout.
#[must_use]
pub fn checkout_notice(total: Price) -> String {
    format!(
        "Checkout demo: cart total {total}\n\n\
         This is a demo. Implement payment backend to process real orders."
    )
}

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub line_price: String,
    pub img: String,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u64,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::from(&Cart::new())
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().map(CartItemView::from).collect(),
            total: cart.total().to_string(),
            item_count: cart.item_count(),
        }
    }
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        let img = if item.img.trim().is_empty() {
            FALLBACK_IMAGE.to_string()
        } else {
            item.img.clone()
        };

        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            price: item.price.to_string(),
            quantity: item.qty.get(),
            line_price: item.line_total().to_string(),
            img,
        }
    }
}

/// Product card display data for the shop page.
#[derive(Debug, Clone)]
pub struct ProductCardView {
    pub id: String,
    pub name: String,
    /// Raw integer price, submitted back by the add form.
    pub price: u64,
    /// Formatted price for display.
    pub price_display: String,
    pub img: String,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: product.price.amount(),
            price_display: product.price.to_string(),
            img: product.img.clone(),
        }
    }
}

/// Collects HTMX events for the current response.
///
/// Subscribe one per request to the request's [`bml_core::CartStore`]; after
/// the mutation, [`HtmxNotifier::respond`] attaches the events.
#[derive(Debug, Default)]
pub struct HtmxNotifier {
    events: Mutex<BTreeMap<&'static str, serde_json::Value>>,
}

impl HtmxNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the browser to show `message` to the shopper.
    pub fn notice(&self, message: impl Into<String>) {
        self.emit(CART_NOTICE_EVENT, serde_json::Value::String(message.into()));
    }

    /// Ask the cart panel to close itself.
    pub fn close_panel(&self) {
        self.emit(PANEL_CLOSE_EVENT, serde_json::Value::Null);
    }

    /// The `HX-Trigger` header value, or `None` when nothing happened.
    #[must_use]
    pub fn header_value(&self) -> Option<HeaderValue> {
        let events = self.events.lock().ok()?;
        if events.is_empty() {
            return None;
        }
        let json = serde_json::to_string(&*events).ok()?;
        HeaderValue::from_str(&json).ok()
    }

    /// Turn `body` into a response carrying the collected events.
    pub fn respond(&self, body: impl IntoResponse) -> Response {
        let mut response = body.into_response();
        if let Some(value) = self.header_value() {
            response.headers_mut().insert(HX_TRIGGER, value);
        }
        response
    }

    fn emit(&self, name: &'static str, detail: serde_json::Value) {
        match self.events.lock() {
            Ok(mut events) => {
                events.insert(name, detail);
            }
            Err(_) => tracing::warn!(event = name, "HTMX notifier lock poisoned; event dropped"),
        }
    }
}

impl CartObserver for HtmxNotifier {
    fn notify(&self, event: &CartEvent) {
        match *event {
            CartEvent::Changed => self.emit(CART_UPDATED_EVENT, serde_json::Value::Null),
            CartEvent::CountChanged { count } => self.emit(CART_COUNT_EVENT, count.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bml_core::ItemId;

    use super::*;

    fn shirt(img: &str) -> Product {
        Product {
            id: ItemId::parse("p1").unwrap(),
            name: "Shirt".to_string(),
            price: Price::new(25_000),
            img: img.to_string(),
        }
    }

    #[test]
    fn test_cart_view_formats_prices() {
        let mut cart = Cart::new();
        cart.add(shirt("x.jpg"));
        cart.add(shirt("x.jpg"));

        let view = CartView::from(&cart);
        assert_eq!(view.total, "UGX 50,000");
        assert_eq!(view.item_count, 2);

        let line = view.items.first().unwrap();
        assert_eq!(line.price, "UGX 25,000");
        assert_eq!(line.line_price, "UGX 50,000");
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::empty();
        assert!(view.items.is_empty());
        assert_eq!(view.total, "UGX 0");
        assert_eq!(view.item_count, 0);
    }

    #[test]
    fn test_missing_image_falls_back() {
        let mut cart = Cart::new();
        cart.add(shirt(""));

        let view = CartView::from(&cart);
        assert_eq!(view.items.first().unwrap().img, FALLBACK_IMAGE);
    }

    #[test]
    fn test_notifier_maps_store_events() {
        let notifier = HtmxNotifier::new();
        notifier.notify(&CartEvent::CountChanged { count: 3 });
        notifier.notify(&CartEvent::Changed);

        let header = notifier.header_value().unwrap();
        let json: serde_json::Value = serde_json::from_str(header.to_str().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"cart-count": 3, "cart-updated": null})
        );
    }

    #[test]
    fn test_notifier_without_events_sets_no_header() {
        let notifier = HtmxNotifier::new();
        assert!(notifier.header_value().is_none());
        assert!(notifier.respond(()).headers().get(HX_TRIGGER).is_none());
    }

    #[test]
    fn test_checkout_notice_mentions_total() {
        let notice = checkout_notice(Price::new(50_000));
        assert!(notice.starts_with("Checkout demo: cart total UGX 50,000"));
    }

    #[test]
    fn test_notice_header_is_valid_with_newlines() {
        let notifier = HtmxNotifier::new();
        notifier.notice(checkout_notice(Price::new(1_000)));
        notifier.close_panel();

        // Newlines are escaped by JSON, so the header value is legal.
        let header = notifier.header_value().unwrap();
        let json: serde_json::Value = serde_json::from_str(header.to_str().unwrap()).unwrap();
        assert!(json["cart-notice"].as_str().unwrap().contains("UGX 1,000"));
        assert!(json.get(PANEL_CLOSE_EVENT).is_some());
    }
}
