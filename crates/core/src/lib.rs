//! Open Impact Core - Shared identity and access-gating library.
//!
//! This crate provides the types and decision logic used across all Open Impact
//! components:
//! - `web` - Server-rendered site (session store, extractors, pages)
//! - `cli` - Command-line tools for migrations and account provisioning
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Route guard decisions are computed here and applied
//! (redirects, rejections) by the web crate.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, account types and organizations
//! - [`identity`] - The signed-in principal and partial profile updates
//! - [`session`] - Session state and the read-only auth accessor view
//! - [`access`] - Account-type gate
//! - [`guard`] - Route guard and guest guard decisions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod guard;
pub mod identity;
pub mod session;
pub mod types;

pub use access::{RequiredTypes, has_access};
pub use guard::{
    GuardDecision, GuardDestinations, GuardResult, GuestDecision, GuestGuard, REDIRECT_PARAM,
    RouteGuard, is_safe_redirect,
};
pub use identity::{Identity, IdentityUpdate, ProfileError};
pub use session::{AuthState, SessionState};
pub use types::*;
