//! Authentication extractors.
//!
//! Guard decisions come from `open_impact_core::guard`; these extractors
//! apply them. Page requests are redirected, `/api/` requests get a JSON
//! `401` or `403`.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn company_dashboard(
//!     RequireAccountType(identity, ..): RequireAccountType<CompanyOnly>,
//! ) -> impl IntoResponse {
//!     format!("Hello, {}!", identity.name)
//! }
//! ```

use std::marker::PhantomData;

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri, Query},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;

use open_impact_core::{
    AccountType, AuthState, GuardDecision, GuestDecision, GuestGuard, Identity, RequiredTypes,
    RouteGuard, SessionState,
};

use crate::services::AuthSession;
use crate::state::AppState;

/// Rejection produced by the guard extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Send the browser elsewhere.
    Redirect(String),
    /// Not signed in (API requests).
    Unauthorized,
    /// Signed in with the wrong account type (API requests).
    Forbidden,
    /// The session context middleware did not run.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(to) => Redirect::to(&to).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthenticated" })),
            )
                .into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "wrong_account_type" })),
            )
                .into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or_else(|| {
            tracing::error!("AuthSession extractor used without session context middleware");
            AuthRejection::MissingSession
        })
    }
}

/// Path plus query as the browser requested it (before any nesting).
fn requested_path(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0);

    uri.path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned())
}

fn is_api(parts: &Parts) -> bool {
    requested_path(parts).starts_with("/api/")
}

/// Settled session state: waits out any in-flight operation.
async fn settled_state(parts: &Parts) -> Result<SessionState, AuthRejection> {
    let session = parts
        .extensions
        .get::<AuthSession>()
        .ok_or(AuthRejection::MissingSession)?;
    Ok(session.settled().await)
}

/// Run a route guard, re-evaluating after loading completes.
async fn enforce(
    parts: &Parts,
    state: &AppState,
    guard: RouteGuard,
) -> Result<Identity, AuthRejection> {
    let guard = guard.with_destinations(state.destinations().clone());
    let requested = requested_path(parts);
    let session = parts
        .extensions
        .get::<AuthSession>()
        .ok_or(AuthRejection::MissingSession)?;

    let mut decision = guard.decide(&session.current(), &requested);
    if matches!(decision, GuardDecision::Checking) {
        decision = guard.decide(&session.settled().await, &requested);
    }

    match decision {
        GuardDecision::Granted(identity) => Ok(identity),
        GuardDecision::DeniedUnauthenticated { redirect } => {
            tracing::debug!(path = %requested, "Denied: not signed in");
            Err(if is_api(parts) {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::Redirect(redirect)
            })
        }
        GuardDecision::DeniedWrongAccountType { redirect } => {
            tracing::debug!(path = %requested, %redirect, "Denied: wrong account type");
            Err(if is_api(parts) {
                AuthRejection::Forbidden
            } else {
                AuthRejection::Redirect(redirect)
            })
        }
        // `settled` never returns a loading state.
        GuardDecision::Checking => Err(AuthRejection::MissingSession),
    }
}

// =============================================================================
// RequireAuth
// =============================================================================

/// Extractor that requires a signed-in identity of any account type.
///
/// Anonymous visitors are redirected to `/auth?redirect=<requested path>`.
pub struct RequireAuth(pub Identity);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        enforce(parts, state, RouteGuard::authenticated())
            .await
            .map(Self)
    }
}

// =============================================================================
// RequireAccountType
// =============================================================================

/// Account-type requirement for [`RequireAccountType`].
pub trait AccountTypePolicy: Send + Sync + 'static {
    /// Account types allowed through.
    const REQUIRED: RequiredTypes;

    /// Where to send signed-in identities of other types. `None` means
    /// their own dashboard.
    const FALLBACK: Option<&'static str> = None;
}

/// Company accounts only.
pub struct CompanyOnly;

impl AccountTypePolicy for CompanyOnly {
    const REQUIRED: RequiredTypes = RequiredTypes::only(AccountType::Company);
}

/// Individual and nonprofit accounts.
pub struct PeopleOnly;

impl AccountTypePolicy for PeopleOnly {
    const REQUIRED: RequiredTypes =
        RequiredTypes::only(AccountType::Individual).with(AccountType::Nonprofit);
}

/// Extractor that requires a signed-in identity whose account type `P` allows.
pub struct RequireAccountType<P: AccountTypePolicy>(pub Identity, pub PhantomData<P>);

impl<P: AccountTypePolicy> FromRequestParts<AppState> for RequireAccountType<P> {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let mut guard = RouteGuard::account_types(P::REQUIRED);
        if let Some(fallback) = P::FALLBACK {
            guard = guard.with_fallback(fallback);
        }

        enforce(parts, state, guard)
            .await
            .map(|identity| Self(identity, PhantomData))
    }
}

// =============================================================================
// RedirectIfAuthenticated
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct RedirectQuery {
    redirect: Option<String>,
}

/// Guest guard extractor for the sign-in / sign-up page.
///
/// Signed-in visitors are sent to the `redirect` query parameter (if it is a
/// safe local path) or their dashboard. Holds the redirect target to carry
/// through the forms.
pub struct RedirectIfAuthenticated(pub Option<String>);

impl FromRequestParts<AppState> for RedirectIfAuthenticated {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let query = Query::<RedirectQuery>::from_request_parts(parts, state)
            .await
            .map(|Query(query)| query)
            .unwrap_or_default();

        let guard = GuestGuard::new(state.destinations().clone());
        let session_state = settled_state(parts).await?;

        match guard.decide(&session_state, query.redirect.as_deref()) {
            GuestDecision::Render => Ok(Self(query.redirect)),
            GuestDecision::Redirect(to) => Err(AuthRejection::Redirect(to)),
            GuestDecision::Checking => Err(AuthRejection::MissingSession),
        }
    }
}

// =============================================================================
// OptionalAuth
// =============================================================================

/// Extractor for the read accessor view; never rejects a visitor.
///
/// Waits for any in-flight operation to settle, so `is_loading` is false.
pub struct OptionalAuth(pub AuthState);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(settled_state(parts).await?.auth_state()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_requested_path_keeps_query() {
        let parts = parts("/company-dashboard?tab=team");
        assert_eq!(requested_path(&parts), "/company-dashboard?tab=team");
    }

    #[test]
    fn test_requested_path_prefers_original_uri() {
        let mut parts = parts("/");
        parts
            .extensions
            .insert(OriginalUri("/api/session".parse().unwrap()));
        assert_eq!(requested_path(&parts), "/api/session");
    }

    #[test]
    fn test_is_api() {
        assert!(is_api(&parts("/api/session")));
        assert!(!is_api(&parts("/apiary")));
        assert!(!is_api(&parts("/dashboard")));
    }

    #[test]
    fn test_policies() {
        assert!(CompanyOnly::REQUIRED.contains(AccountType::Company));
        assert!(!CompanyOnly::REQUIRED.contains(AccountType::Nonprofit));
        assert!(PeopleOnly::REQUIRED.contains(AccountType::Individual));
        assert!(PeopleOnly::REQUIRED.contains(AccountType::Nonprofit));
        assert!(!PeopleOnly::REQUIRED.contains(AccountType::Company));
    }

    #[test]
    fn test_rejection_responses() {
        let response = AuthRejection::Redirect("/auth".into()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/auth");

        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_missing_session_context() {
        let mut parts = parts("/");
        let result = OptionalAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::MissingSession)));
    }
}
