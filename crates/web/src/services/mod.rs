//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Identity providers, credentials, sign-up validation
//! - `session` - Per-request session store (the auth state container)
//! - `oauth` - `OpenID` Connect authorization-code client

pub mod auth;
pub mod oauth;
pub mod session;

pub use session::{AuthSession, SessionStore};
