//! OpenID Connect sign-in route handlers.
//!
//! - Login: stores `state`, `nonce` and the return path, then redirects to
//!   the provider
//! - Callback: checks `state`, exchanges the code, fetches userinfo and signs
//!   the visitor in through the session store
//!
//! Both routes answer 404 when OAuth is not configured.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use open_impact_core::is_safe_redirect;

use crate::error::AppError;
use crate::middleware::RedirectIfAuthenticated;
use crate::models::session_keys;
use crate::services::AuthSession;
use crate::services::auth::{Credentials, ExternalProfile};
use crate::services::oauth::{OAuthClient, OAuthError, random_token};
use crate::state::AppState;

const CALLBACK_PATH: &str = "/auth/oauth/callback";
const TOKEN_LENGTH: usize = 32;

/// Query parameters from the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

fn client(state: &AppState) -> Result<&OAuthClient, AppError> {
    state
        .oauth()
        .ok_or_else(|| AppError::NotFound("OAuth sign-in is not configured".to_owned()))
}

fn fail(code: &str) -> Response {
    Redirect::to(&format!("/auth?error={code}")).into_response()
}

async fn store_flow(
    session: &Session,
    oauth_state: &str,
    nonce: &str,
    return_to: Option<&str>,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::OAUTH_STATE, oauth_state).await?;
    session.insert(session_keys::OAUTH_NONCE, nonce).await?;
    match return_to.filter(|r| is_safe_redirect(r)) {
        Some(return_to) => session.insert(session_keys::OAUTH_RETURN_TO, return_to).await,
        None => session
            .remove_value(session_keys::OAUTH_RETURN_TO)
            .await
            .map(|_| ()),
    }
}

async fn fetch_profile(
    client: &OAuthClient,
    code: &str,
    redirect_uri: &str,
) -> Result<ExternalProfile, OAuthError> {
    let token = client.exchange_code(code, redirect_uri).await?;
    client
        .userinfo(&token.access_token)
        .await?
        .into_profile(client.provider_name())
}

/// Start the OAuth flow.
///
/// Signed-in visitors are sent on to `redirect` or their dashboard instead.
///
/// # Route
///
/// `GET /auth/oauth/login`
pub async fn login(
    RedirectIfAuthenticated(redirect): RedirectIfAuthenticated,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let client = client(&state)?;

    let oauth_state = random_token(TOKEN_LENGTH);
    let nonce = random_token(TOKEN_LENGTH);

    if let Err(e) = store_flow(&session, &oauth_state, &nonce, redirect.as_deref()).await {
        tracing::error!(error = %e, "Failed to store OAuth state in session");
        return Ok(fail("session"));
    }

    let redirect_uri = state.config().absolute_url(CALLBACK_PATH);
    let auth_url = client.authorization_url(&redirect_uri, &oauth_state, &nonce)?;

    tracing::debug!(provider = client.provider_name(), "Redirecting to OAuth provider");
    Ok(Redirect::to(&auth_url).into_response())
}

/// Finish the OAuth flow.
///
/// # Route
///
/// `GET /auth/oauth/callback`
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    auth: AuthSession,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let client = client(&state)?;

    // One-time use, whatever the outcome
    let stored_state: Option<String> = session
        .remove(session_keys::OAUTH_STATE)
        .await
        .ok()
        .flatten();
    let _ = session.remove_value(session_keys::OAUTH_NONCE).await;
    let return_to: Option<String> = session
        .remove(session_keys::OAUTH_RETURN_TO)
        .await
        .ok()
        .flatten();

    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        tracing::warn!(%error, %description, "OAuth provider returned an error");
        return Ok(fail("oauth_denied"));
    }

    let Some(code) = query.code else {
        tracing::warn!("OAuth callback missing code");
        return Ok(fail("oauth_state"));
    };

    if stored_state.is_none() || stored_state != query.state {
        tracing::warn!("OAuth state mismatch");
        return Ok(fail("oauth_state"));
    }

    let redirect_uri = state.config().absolute_url(CALLBACK_PATH);
    let profile = match fetch_profile(client, &code, &redirect_uri).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(error = %e, "OAuth exchange failed");
            return Ok(fail("unavailable"));
        }
    };

    let result = auth
        .lock()
        .await
        .sign_in(&Credentials::External(profile))
        .await;

    Ok(match result {
        Ok(identity) => Redirect::to(
            &state
                .destinations()
                .post_sign_in(identity.account_type, return_to.as_deref()),
        )
        .into_response(),
        Err(e) => {
            tracing::warn!(code = e.code(), error = %e, "OAuth sign-in rejected");
            fail(e.code())
        }
    })
}
