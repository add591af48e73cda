//! Application state shared across handlers.

use std::sync::Arc;

use open_impact_core::GuardDestinations;

use crate::config::WebConfig;
use crate::services::auth::IdentityProvider;
use crate::services::oauth::{OAuthClient, OAuthError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The session store itself is
/// per request and lives in request extensions, not here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    provider: Arc<dyn IdentityProvider>,
    oauth: Option<OAuthClient>,
    destinations: GuardDestinations,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Web configuration
    /// * `provider` - Identity provider that verifies credentials
    ///
    /// # Errors
    ///
    /// Returns an error if the OAuth configuration is invalid.
    pub fn new(
        config: WebConfig,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, OAuthError> {
        let oauth = config.oauth.clone().map(OAuthClient::new).transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                provider,
                oauth,
                destinations: GuardDestinations::default(),
            }),
        })
    }

    /// Get a reference to the web configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Shared handle to the identity provider.
    #[must_use]
    pub fn provider(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.inner.provider)
    }

    /// OAuth client, when OAuth sign-in is configured.
    #[must_use]
    pub fn oauth(&self) -> Option<&OAuthClient> {
        self.inner.oauth.as_ref()
    }

    /// Where guards send visitors.
    #[must_use]
    pub fn destinations(&self) -> &GuardDestinations {
        &self.inner.destinations
    }
}
