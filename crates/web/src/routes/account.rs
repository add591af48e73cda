//! Account route handlers (requires authentication).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use open_impact_core::{Identity, IdentityUpdate};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::services::AuthSession;
use crate::services::auth::{AuthError, RegistrationErrors};

/// Query parameters for the account page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AccountQuery {
    pub saved: Option<String>,
}

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub signed_in: Option<Identity>,
    pub identity: Identity,
    pub saved: bool,
    pub errors: RegistrationErrors,
}

/// `GET /account`
pub async fn show(
    RequireAuth(identity): RequireAuth,
    Query(query): Query<AccountQuery>,
) -> impl IntoResponse {
    AccountTemplate {
        signed_in: Some(identity.clone()),
        identity,
        saved: query.saved.is_some(),
        errors: RegistrationErrors::default(),
    }
}

/// `POST /account`
///
/// Form fields use the camelCase names of [`IdentityUpdate`]. A link that
/// is not an http(s) address re-renders the form with the error inline and
/// nothing saved.
pub async fn update(
    RequireAuth(identity): RequireAuth,
    auth: AuthSession,
    Form(update): Form<IdentityUpdate>,
) -> Result<Response> {
    if update.is_empty() {
        return Ok(Redirect::to("/account").into_response());
    }

    let updated = match auth.lock().await.update_identity(&update).await {
        Ok(updated) => updated,
        Err(AuthError::InvalidProfile(err)) => {
            tracing::info!(identity_id = %identity.id, field = err.field, "Rejected profile link");
            let page = AccountTemplate {
                signed_in: Some(identity.clone()),
                identity,
                saved: false,
                errors: RegistrationErrors::single(
                    err.field,
                    "Enter a valid web address (http or https)",
                ),
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
        Err(err) => return Err(err.into()),
    };

    Ok(match updated {
        Some(_) => Redirect::to("/account?saved=1").into_response(),
        // Signed out by a concurrent request since the guard ran.
        None => {
            tracing::warn!(identity_id = %identity.id, "Profile update without a session");
            Redirect::to("/auth?redirect=%2Faccount").into_response()
        }
    })
}
