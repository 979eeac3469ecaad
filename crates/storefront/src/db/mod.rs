//! Storage for the storefront.
//!
//! The storefront keeps no tables of its own. A shopper's cart is a single
//! value in their session (see [`session_cart`]); the session itself is kept
//! either in process memory or, when a database URL is configured, in the
//! `tower_sessions` schema of `PostgreSQL`.
//!
//! The session table is created by `PostgresStore::migrate` at startup.

pub mod session_cart;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use session_cart::SessionCartRepository;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
