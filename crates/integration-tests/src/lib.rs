//! Integration tests for Open Impact.
//!
//! Each test boots the full router on an ephemeral port with the in-memory
//! identity provider and session store, then drives it over HTTP with a
//! cookie-keeping client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p open-impact-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `guards` - Route guards and the account-type gate
//! - `session_flow` - Sign-up, sign-in, sign-out and profile updates
//! - `api` - JSON session endpoints

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use reqwest::{Client, Response, redirect};
use tokio::net::TcpListener;
use tower_sessions::MemoryStore;

use open_impact_web::config::{IdentityBackend, WebConfig};
use open_impact_web::middleware::create_session_layer;
use open_impact_web::services::auth::{IdentityProvider, MemoryIdentityProvider};
use open_impact_web::{AppState, app};

/// Password used by every account the helpers create.
pub const PASSWORD: &str = "correct-horse-battery";

/// A running server plus a client holding its session cookie.
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub provider: Arc<MemoryIdentityProvider>,
}

impl TestApp {
    /// Start a fresh server with no accounts.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot bind a local port.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");
        let base_url = format!("http://{addr}");

        let config = WebConfig {
            host: addr.ip(),
            port: addr.port(),
            base_url: base_url.clone(),
            database_url: None,
            identity_backend: IdentityBackend::Memory,
            rate_limit: false,
            oauth: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_traces_sample_rate: 0.0,
        };

        let provider = Arc::new(MemoryIdentityProvider::new());
        let dyn_provider: Arc<dyn IdentityProvider> = provider.clone();
        let state = AppState::new(config.clone(), dyn_provider).expect("Failed to build state");
        let router = app(state, create_session_layer(MemoryStore::default(), &config));

        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        Self {
            base_url,
            client: new_client(),
            provider,
        }
    }

    /// A second browser against the same server.
    #[must_use]
    pub fn fresh_client(&self) -> Client {
        new_client()
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET path` without following redirects.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    /// `POST path` with a urlencoded form.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Sign up an individual and keep the session.
    pub async fn sign_up_individual(&self, name: &str, email: &str) -> Response {
        self.post_form(
            "/auth/sign-up",
            &[
                ("name", name),
                ("email", email),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
            ],
        )
        .await
    }

    /// Sign up a company or nonprofit and keep the session.
    pub async fn sign_up_organization(&self, account_type: &str, email: &str) -> Response {
        self.post_form(
            "/auth/sign-up/organization",
            &[
                ("account_type", account_type),
                ("company_name", "Acme Renewables"),
                ("industry", "Energy"),
                ("company_size", "51-200"),
                ("website", "https://acme.example"),
                ("first_name", "Grace"),
                ("last_name", "Hopper"),
                ("job_title", "Head of Impact"),
                ("email", email),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
                ("agree_to_terms", "on"),
            ],
        )
        .await
    }

    /// Sign in with the shared test password.
    pub async fn sign_in(&self, email: &str, redirect: Option<&str>) -> Response {
        let mut form = vec![("email", email), ("password", PASSWORD)];
        if let Some(redirect) = redirect {
            form.push(("redirect", redirect));
        }
        self.post_form("/auth/sign-in", &form).await
    }

    /// Sign out.
    pub async fn sign_out(&self) -> Response {
        self.post_form("/auth/sign-out", &[]).await
    }
}

fn new_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// The `Location` header of a redirect response.
///
/// # Panics
///
/// Panics if the response is not a redirect.
#[must_use]
pub fn location(response: &Response) -> String {
    assert!(
        response.status().is_redirection(),
        "expected a redirect, got {}",
        response.status()
    );
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("redirect without Location")
        .to_owned()
}
