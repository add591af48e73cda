//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Landing page
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (identity provider)
//!
//! # Auth (guest guard)
//! GET  /auth                      - Sign-in / sign-up page
//! POST /auth/sign-in              - Password sign-in
//! POST /auth/sign-up              - Individual sign-up
//! POST /auth/sign-up/organization - Company / nonprofit sign-up
//! POST /auth/sign-out             - Sign out
//! GET  /auth/oauth/login          - Redirect to OAuth provider
//! GET  /auth/oauth/callback       - Handle OAuth callback
//!
//! # Guarded pages
//! GET  /dashboard                 - Individual + nonprofit dashboard
//! GET  /company-dashboard         - Company dashboard
//! GET  /company-profile           - Organization profile (any signed-in)
//! GET  /account                   - Profile
//! POST /account                   - Update profile
//!
//! # API
//! GET  /api/session               - Auth state JSON
//! GET  /api/me                    - Signed-in identity JSON (401 if anonymous)
//! GET  /api/access                - Guard evaluation JSON (`?types=company,nonprofit`)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod company;
pub mod dashboard;
pub mod home;
pub mod oauth;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore as SessionBackend};
use tracing::Span;

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id_middleware, session_context_middleware,
};
use crate::state::AppState;

/// Form posts that create or verify credentials.
fn auth_form_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-up/organization", post(auth::sign_up_organization));

    if rate_limit {
        router.layer(auth_rate_limiter())
    } else {
        router
    }
}

/// Create the API routes router.
fn api_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/api/session", get(api::session::current))
        .route("/api/me", get(api::session::me))
        .route("/api/access", get(api::session::access));

    if rate_limit {
        router.layer(api_rate_limiter())
    } else {
        router
    }
}

/// Create all session-backed routes.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        // Auth
        .route("/auth", get(auth::auth_page))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/auth/oauth/login", get(oauth::login))
        .route("/auth/oauth/callback", get(oauth::callback))
        .merge(auth_form_routes(rate_limit))
        // Guarded pages
        .route("/dashboard", get(dashboard::dashboard))
        .route("/company-dashboard", get(dashboard::company_dashboard))
        .route("/company-profile", get(company::company_profile))
        .route("/account", get(account::show).post(account::update))
        .merge(api_routes(rate_limit))
}

/// Build the application with its middleware stack.
///
/// `sessions` is the tower-sessions layer (`PostgresStore` in production,
/// `MemoryStore` in development and tests).
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>) -> Router
where
    S: SessionBackend + Clone,
{
    Router::new()
        .merge(routes(state.config().rate_limit))
        .layer(from_fn_with_state(state.clone(), session_context_middleware))
        .layer(sessions)
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        identity_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the identity provider is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.provider().is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
