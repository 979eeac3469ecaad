//! BML storefront library.
//!
//! The shop front with its session-persisted cart, exposed as a library so
//! the router can be driven from tests without binding a socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod view;
