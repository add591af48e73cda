//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required credential field was empty.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] open_impact_core::EmailError),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A profile link was not an http(s) address.
    #[error("invalid profile: {0}")]
    InvalidProfile(#[from] open_impact_core::ProfileError),

    /// An account with this email already exists.
    #[error("email already registered")]
    EmailTaken,

    /// The external provider has not verified the email address.
    #[error("email not verified by provider")]
    UnverifiedEmail,

    /// Account vanished between sign-in and update.
    #[error("account not found")]
    AccountNotFound,

    /// The identity provider could not be reached.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing the session record failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Short code carried in `?error=` on the auth page.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_fields",
            Self::InvalidEmail(_) | Self::InvalidCredentials | Self::AccountNotFound => {
                "credentials"
            }
            Self::EmailTaken => "email_taken",
            Self::InvalidProfile(_) => "invalid_profile",
            Self::UnverifiedEmail => "unverified_email",
            Self::Unavailable(_) | Self::Repository(_) | Self::PasswordHash => "unavailable",
            Self::Session(_) => "session",
        }
    }

    /// Whether the failure is the caller's (as opposed to ours).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_)
                | Self::InvalidEmail(_)
                | Self::InvalidCredentials
                | Self::EmailTaken
                | Self::InvalidProfile(_)
                | Self::UnverifiedEmail
                | Self::AccountNotFound
        )
    }
}

/// Human-readable message for an `?error=` code.
#[must_use]
pub fn message_for_code(code: &str) -> &'static str {
    match code {
        "missing_fields" => "Please fill in all fields",
        "credentials" => "Invalid email or password",
        "email_taken" => "An account with this email already exists",
        "invalid_profile" => "Enter a valid web address (http or https)",
        "unverified_email" => "Your email address has not been verified with the provider",
        "session" => "Your session expired, please try again",
        "oauth_denied" => "Sign-in was cancelled",
        "oauth_state" => "Sign-in link expired, please try again",
        _ => "Something went wrong, please try again",
    }
}
