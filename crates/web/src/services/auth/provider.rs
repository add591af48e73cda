//! The identity provider seam.
//!
//! Credential policy lives entirely behind [`IdentityProvider`]; the session
//! store only checks that credentials are well formed before delegating.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use open_impact_core::Identity;

use super::AuthError;
use super::registration::Registration;

/// What a visitor presents to sign in.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Email and password.
    Password {
        email: String,
        password: SecretString,
    },
    /// Profile returned by an OAuth provider after a successful handshake.
    External(ExternalProfile),
}

impl Credentials {
    /// Email/password credentials.
    #[must_use]
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Check that every required field is present.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` naming the first empty field.
    pub fn validate_shape(&self) -> Result<(), AuthError> {
        match self {
            Self::Password { email, password } => {
                if email.trim().is_empty() {
                    return Err(AuthError::MissingField("email"));
                }
                if password.expose_secret().is_empty() {
                    return Err(AuthError::MissingField("password"));
                }
            }
            Self::External(profile) => {
                if profile.subject.trim().is_empty() {
                    return Err(AuthError::MissingField("subject"));
                }
                if profile.email.trim().is_empty() {
                    return Err(AuthError::MissingField("email"));
                }
            }
        }
        Ok(())
    }

    /// Short label for logs.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Password { .. } => "password",
            Self::External(profile) => &profile.provider,
        }
    }
}

/// Identity asserted by an external OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    /// Provider label (`google`).
    pub provider: String,
    /// Provider's stable user ID (`sub`).
    pub subject: String,
    /// Email address reported by the provider.
    pub email: String,
    /// Whether the provider verified that email.
    pub email_verified: bool,
    /// Display name, if shared.
    pub name: Option<String>,
    /// Profile picture URL, if shared.
    pub image: Option<String>,
}

/// Verifies credentials and owns account records.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Verify credentials and return the matching identity.
    ///
    /// External profiles with a verified email sign in to (or create) the
    /// account with that email.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError>;

    /// Create an account from a validated registration.
    async fn register(&self, registration: &Registration) -> Result<Identity, AuthError>;

    /// Persist the mutable profile fields of `identity`.
    async fn update_profile(&self, identity: &Identity) -> Result<(), AuthError>;

    /// Whether the backend can serve requests.
    async fn is_ready(&self) -> bool;
}

/// Display name for a first external sign-in.
pub(crate) fn external_display_name(profile: &ExternalProfile, fallback: &str) -> String {
    profile
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback)
        .to_owned()
}
