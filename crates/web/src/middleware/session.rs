//! Session middleware configuration.
//!
//! Sets up the tower-sessions cookie layer and the per-request
//! [`AuthSession`] built on top of it.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore as SessionBackend};

use crate::config::WebConfig;
use crate::error::AppError;
use crate::services::{AuthSession, SessionStore};
use crate::state::AppState;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "oi_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over any tower-sessions store.
///
/// Production uses `PostgresStore`; development and tests use `MemoryStore`.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &WebConfig) -> SessionManagerLayer<S>
where
    S: SessionBackend + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Build and hydrate this request's [`AuthSession`].
///
/// Must run inside the session layer. Hydration never fails; a corrupt
/// record leaves the visitor signed out.
pub async fn session_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(session) = request.extensions().get::<Session>().cloned() else {
        tracing::error!("Session layer missing in front of session context");
        return AppError::Internal("session layer missing".to_owned()).into_response();
    };

    let auth = AuthSession::new(SessionStore::new(
        session,
        state.provider(),
        state.destinations(),
    ));
    auth.hydrate().await;

    if let Some(identity) = auth.current().identity() {
        tracing::Span::current().record("identity_id", tracing::field::display(identity.id));
    }

    request.extensions_mut().insert(auth);
    next.run(request).await
}
