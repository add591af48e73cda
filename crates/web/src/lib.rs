//! Open Impact web library.
//!
//! This crate provides the server-rendered site as a library, allowing it to
//! be tested and reused. Session state lives in a per-request
//! [`services::SessionStore`]; route guards from `open_impact_core` are
//! applied by the extractors in [`middleware::auth`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
