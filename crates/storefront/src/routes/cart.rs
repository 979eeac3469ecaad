//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Mutations answer with an empty body and an `HX-Trigger` header; every cart
//! sink on the page then re-fetches its own fragment from the `GET` routes
//! below, which re-read the cart from the session.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::Query,
    response::{IntoResponse, Response},
};
use bml_core::{CartStore, CheckoutOutcome, ItemId, Price, Product, QtyChange};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::SessionCartRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::view::{CartView, EMPTY_CART_NOTICE, HtmxNotifier, checkout_notice};

// =============================================================================
// Store Helpers
// =============================================================================

/// Cart store over the shopper's session, without observers.
fn session_store(session: Session) -> CartStore<SessionCartRepository> {
    CartStore::new(SessionCartRepository::new(session))
}

/// Cart store over the shopper's session, reporting to a fresh notifier.
fn observed_store(session: Session) -> (CartStore<SessionCartRepository>, Arc<HtmxNotifier>) {
    let notifier = Arc::new(HtmxNotifier::new());
    let mut store = session_store(session);
    store.subscribe(notifier.clone());
    (store, notifier)
}

/// Current cart, ready for a template.
async fn current_cart(session: Session) -> CartView {
    CartView::from(&session_store(session).load().await)
}

fn parse_item_id(raw: &str) -> Result<ItemId> {
    ItemId::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data, copied from the product card.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub id: String,
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub img: String,
}

impl AddToCartForm {
    fn into_product(self) -> Result<Product> {
        let id = parse_item_id(&self.id)?;
        let price = self
            .price
            .trim()
            .parse::<u64>()
            .map_err(|_| AppError::BadRequest(format!("invalid price: {:?}", self.price)))?;

        Ok(Product {
            id,
            name: self.name.trim().to_string(),
            price: Price::new(price),
            img: self.img.trim().to_string(),
        })
    }
}

/// Quantity change form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub id: String,
    pub delta: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub id: String,
}

/// Requested panel visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelState {
    Open,
    #[default]
    Closed,
}

/// Panel query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PanelQuery {
    #[serde(default)]
    pub state: PanelState,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub panel_open: bool,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart total fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_total.html")]
pub struct CartTotalTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub cart: CartView,
}

/// Slide-out cart panel fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_panel.html")]
pub struct CartPanelTemplate {
    pub cart: CartView,
    pub panel_open: bool,
}

// =============================================================================
// Sinks
// =============================================================================

/// Display cart page.
#[instrument(skip(session))]
pub async fn show(session: Session) -> impl IntoResponse {
    CartShowTemplate {
        cart: current_cart(session).await,
        panel_open: false,
    }
}

/// Cart item list (HTMX).
#[instrument(skip(session))]
pub async fn items(session: Session) -> impl IntoResponse {
    CartItemsTemplate {
        cart: current_cart(session).await,
    }
}

/// Cart total (HTMX).
#[instrument(skip(session))]
pub async fn total(session: Session) -> impl IntoResponse {
    CartTotalTemplate {
        cart: current_cart(session).await,
    }
}

/// Cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        cart: current_cart(session).await,
    }
}

/// Cart panel, opened or closed (HTMX).
#[instrument(skip(session))]
pub async fn panel(session: Session, Query(query): Query<PanelQuery>) -> impl IntoResponse {
    CartPanelTemplate {
        cart: current_cart(session).await,
        panel_open: query.state == PanelState::Open,
    }
}

// =============================================================================
// Mutations
// =============================================================================

/// Add one unit of a product to the cart (HTMX).
#[instrument(skip(session))]
pub async fn add(session: Session, Form(form): Form<AddToCartForm>) -> Result<Response> {
    let product = form.into_product()?;
    let id = product.id.clone();

    let (store, notifier) = observed_store(session);
    let qty = store.add(product).await?;

    add_breadcrumb("cart", "Added item", Some(&[("item_id", id.as_str())]));
    tracing::info!(item_id = %id, qty = qty.get(), "Item added to cart");

    Ok(notifier.respond(()))
}

/// Change an item's quantity by a signed delta (HTMX).
///
/// Dropping to zero or below removes the line. Unknown ids are ignored.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Response> {
    let id = parse_item_id(&form.id)?;

    let (store, notifier) = observed_store(session);
    match store.change_qty(&id, form.delta).await? {
        QtyChange::Absent => tracing::debug!(item_id = %id, "Quantity change for absent item"),
        QtyChange::Updated(qty) => tracing::info!(item_id = %id, qty = qty.get(), "Quantity changed"),
        QtyChange::Removed => tracing::info!(item_id = %id, "Item removed at zero quantity"),
    }

    Ok(notifier.respond(()))
}

/// Remove an item from the cart (HTMX). Unknown ids are ignored.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Response> {
    let id = parse_item_id(&form.id)?;

    let (store, notifier) = observed_store(session);
    if store.remove(&id).await? {
        add_breadcrumb("cart", "Removed item", Some(&[("item_id", id.as_str())]));
        tracing::info!(item_id = %id, "Item removed from cart");
    }

    Ok(notifier.respond(()))
}

/// Empty the cart (HTMX).
///
/// The clear button asks for confirmation client-side (`hx-confirm`); this
/// request is only sent once the shopper agrees.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Response> {
    let (store, notifier) = observed_store(session);
    store.clear().await?;

    add_breadcrumb("cart", "Cleared cart", None);
    tracing::info!("Cart cleared");

    Ok(notifier.respond(()))
}

/// Mock checkout (HTMX).
///
/// An empty cart only gets a notice. Otherwise the shopper is shown the
/// total, the cart is cleared and the panel closes. No order is placed.
#[instrument(skip(session))]
pub async fn checkout(session: Session) -> Result<Response> {
    let (store, notifier) = observed_store(session);

    match store.checkout().await? {
        CheckoutOutcome::Empty => notifier.notice(EMPTY_CART_NOTICE),
        CheckoutOutcome::Completed { total, .. } => {
            add_breadcrumb("cart", "Mock checkout", None);
            notifier.notice(checkout_notice(total));
            notifier.close_panel();
        }
    }

    Ok(notifier.respond(()))
}
