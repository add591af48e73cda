//! Data stored outside the core types.

pub mod session;

pub use session::keys as session_keys;
