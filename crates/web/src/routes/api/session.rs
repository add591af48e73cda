//! Session API.

use axum::{Json, extract::Query};
use serde::Deserialize;

use open_impact_core::{AccountType, AuthState, GuardResult, Identity, RequiredTypes};

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::services::AuthSession;

/// `GET /api/session`
///
/// The read accessor: `{identity, isLoading, isAuthenticated}`.
pub async fn current(OptionalAuth(auth): OptionalAuth) -> Json<AuthState> {
    Json(auth)
}

/// `GET /api/me`
///
/// The signed-in identity, or `401` for anonymous callers.
pub async fn me(RequireAuth(identity): RequireAuth) -> Json<Identity> {
    Json(identity)
}

/// Query parameters for the access check.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AccessQuery {
    /// Comma-separated account types, e.g. `company,nonprofit`.
    pub types: Option<String>,
}

/// `GET /api/access?types=company,nonprofit`
///
/// Evaluates the caller's settled session against an optional account-type
/// requirement: `{loading, authenticated, identity, hasAccess}`. Never
/// rejects; anonymous callers get `hasAccess: false`.
pub async fn access(
    auth: AuthSession,
    Query(query): Query<AccessQuery>,
) -> Result<Json<GuardResult>> {
    let required = query.types.as_deref().map(parse_types).transpose()?;
    let state = auth.settled().await;
    Ok(Json(GuardResult::evaluate(&state, required)))
}

fn parse_types(value: &str) -> Result<RequiredTypes> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.parse::<AccountType>()
                .map_err(|e| AppError::BadRequest(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_types() {
        let types = parse_types("company, nonprofit").unwrap();
        assert!(types.contains(AccountType::Company));
        assert!(types.contains(AccountType::Nonprofit));
        assert!(!types.contains(AccountType::Individual));

        assert!(parse_types("").unwrap().is_empty());
        assert!(matches!(
            parse_types("company,admin"),
            Err(AppError::BadRequest(_))
        ));
    }
}
