//! Integration test harness for the BML storefront.
//!
//! Drives the full router in process (no socket) with `tower::ServiceExt::oneshot`,
//! carrying the session cookie between requests like a browser would. Sessions
//! are kept in a `MemoryStore`, so no database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bml-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]

use std::path::PathBuf;
use std::sync::Mutex;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use bml_storefront::catalog::Catalog;
use bml_storefront::config::StorefrontConfig;
use bml_storefront::middleware::{SESSION_COOKIE_NAME, create_session_layer};
use bml_storefront::routes;
use bml_storefront::state::AppState;
use bml_storefront::view::HX_TRIGGER;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

/// Product catalog shipped with the storefront.
pub const CATALOG_JSON: &str = include_str!("../../storefront/content/products.json");

/// Static assets shipped with the storefront.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../storefront/static");

/// Response body limit for tests.
const BODY_LIMIT: usize = 1024 * 1024;

/// One shopper's browser against a fresh storefront.
pub struct TestApp {
    router: Router,
    cookie: Mutex<Option<String>>,
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Parsed `HX-Trigger` header, if any.
    ///
    /// # Panics
    ///
    /// Panics if the header is present but not JSON.
    #[must_use]
    pub fn trigger(&self) -> Option<serde_json::Value> {
        let raw = self.headers.get(HX_TRIGGER)?;
        let text = raw.to_str().expect("HX-Trigger should be ASCII");
        Some(serde_json::from_str(text).expect("HX-Trigger should be JSON"))
    }

    /// Names of the events in the `HX-Trigger` header, sorted.
    #[must_use]
    pub fn trigger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .trigger()
            .and_then(|value| value.as_object().map(|events| events.keys().cloned().collect()))
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// A storefront with the shipped catalog and in-memory sessions.
    ///
    /// # Panics
    ///
    /// Panics if the shipped catalog does not parse.
    #[must_use]
    pub fn new() -> Self {
        let catalog = Catalog::from_json(CATALOG_JSON).expect("shipped catalog should parse");
        let config = StorefrontConfig {
            static_dir: PathBuf::from(STATIC_DIR),
            ..StorefrontConfig::default()
        };
        let state = AppState::new(config, catalog, None);
        let session_layer = create_session_layer(MemoryStore::default(), state.config());

        Self {
            router: routes::app(state, session_layer),
            cookie: Mutex::new(None),
        }
    }

    /// A second shopper against the same server and session store.
    #[must_use]
    pub fn other_shopper(&self) -> Self {
        Self {
            router: self.router.clone(),
            cookie: Mutex::new(None),
        }
    }

    /// Send a `GET` request.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = self.request("GET", uri).body(Body::empty());
        self.send(request.expect("request should build")).await
    }

    /// Send a `POST` with an `application/x-www-form-urlencoded` body.
    pub async fn post_form(&self, uri: &str, form: &[(&str, &str)]) -> TestResponse {
        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("hx-request", "true")
            .body(Body::from(encode_form(form)));
        self.send(request.expect("request should build")).await
    }

    /// Add one unit of the shipped product with `id`.
    ///
    /// # Panics
    ///
    /// Panics if the catalog has no such product.
    pub async fn add_product(&self, id: &str) -> TestResponse {
        let catalog = Catalog::from_json(CATALOG_JSON).expect("shipped catalog should parse");
        let product = catalog
            .products()
            .iter()
            .find(|p| p.id.as_str() == id)
            .unwrap_or_else(|| panic!("no product {id} in catalog"));
        let price = product.price.amount().to_string();

        self.post_form(
            "/cart/add",
            &[
                ("id", product.id.as_str()),
                ("name", product.name.as_str()),
                ("price", price.as_str()),
                ("img", product.img.as_str()),
            ],
        )
        .await
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match self.cookie.lock().expect("cookie lock").as_deref() {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle request");

        // An emptied session comes back as a removal cookie with no value
        if let Some(cookie) = session_cookie(response.headers()) {
            let removed = cookie.len() == SESSION_COOKIE_NAME.len() + 1;
            *self.cookie.lock().expect("cookie lock") = (!removed).then_some(cookie);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), BODY_LIMIT)
            .await
            .expect("body should be readable");

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

/// `name=value` pair of the session cookie from `Set-Cookie`, if set.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
        .map(str::to_string)
}

fn encode_form(form: &[(&str, &str)]) -> String {
    form.iter()
        .map(|(key, value)| {
            format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
        })
        .collect::<Vec<_>>()
        .join("&")
}
