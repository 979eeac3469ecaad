//! Shop page: the product listing.
//!
//! Each product card carries an add form with the product's id, name, price
//! and image, which `POST /cart/add` copies into the cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use bml_core::CartStore;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::SessionCartRepository;
use crate::state::AppState;
use crate::view::{CartView, ProductCardView};

/// Shop listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/index.html")]
pub struct ShopIndexTemplate {
    pub products: Vec<ProductCardView>,
    pub cart: CartView,
    pub panel_open: bool,
}

/// Display the product listing.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let store = CartStore::new(SessionCartRepository::new(session));
    let cart = CartView::from(&store.load().await);

    ShopIndexTemplate {
        products: state
            .catalog()
            .products()
            .iter()
            .map(ProductCardView::from)
            .collect(),
        cart,
        panel_open: false,
    }
}
