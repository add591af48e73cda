//! Core types for Open Impact.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod account_type;
pub mod email;
pub mod id;
pub mod link;
pub mod organization;

pub use account_type::{AccountType, AccountTypeError};
pub use email::{Email, EmailError};
pub use id::*;
pub use link::{LinkError, normalize_link};
pub use organization::{CompanySize, Industry, Organization, OrganizationError};
