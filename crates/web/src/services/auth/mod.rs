//! Authentication service.
//!
//! Credential verification and account records sit behind the
//! [`IdentityProvider`] trait, with a `PostgreSQL` implementation for
//! deployments and an in-memory one for development and tests.

mod error;
pub mod memory;
pub mod password;
pub mod postgres;
mod provider;
pub mod registration;

pub use error::{AuthError, message_for_code};
pub use memory::MemoryIdentityProvider;
pub use postgres::PostgresIdentityProvider;
pub use provider::{Credentials, ExternalProfile, IdentityProvider};
pub use registration::{
    FieldError, IndividualSignUpForm, OrganizationSignUpForm, Registration, RegistrationErrors,
};
