//! Session state and the read-only auth accessor view.

use serde::Serialize;

use crate::identity::Identity;

/// The current identity (or none) plus the loading flag.
///
/// A fresh session starts in the loading state until hydration finishes.
/// The identity is never exposed while loading, so callers cannot branch on
/// a half-resolved session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    identity: Option<Identity>,
    is_loading: bool,
}

impl SessionState {
    /// Initial state: nothing known yet, hydration pending.
    #[must_use]
    pub const fn loading() -> Self {
        Self {
            identity: None,
            is_loading: true,
        }
    }

    /// Settled, signed-out state.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            identity: None,
            is_loading: false,
        }
    }

    /// Settled, signed-in state.
    #[must_use]
    pub const fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            is_loading: false,
        }
    }

    /// Same identity, with an operation in flight.
    #[must_use]
    pub fn in_flight(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            is_loading: true,
        }
    }

    /// Whether hydration or an auth operation is still pending.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether a settled identity is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !self.is_loading && self.identity.is_some()
    }

    /// The identity, or `None` while loading or signed out.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        if self.is_loading {
            None
        } else {
            self.identity.as_ref()
        }
    }

    /// Snapshot for handlers and the JSON accessor.
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            identity: self.identity().cloned(),
            is_loading: self.is_loading,
            is_authenticated: self.is_authenticated(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::loading()
    }
}

/// Read accessor handed to pages: `{identity, isLoading, isAuthenticated}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub identity: Option<Identity>,
    pub is_loading: bool,
    pub is_authenticated: bool,
}
