//! JSON API route handlers.
//!
//! Guard failures here are `401`/`403` JSON bodies rather than redirects.

pub mod session;
