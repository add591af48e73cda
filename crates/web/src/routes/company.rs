//! Organization profile page.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use open_impact_core::Identity;

use crate::filters;
use crate::middleware::RequireAuth;

/// Organization profile template.
///
/// Open to any signed-in identity; individuals see a prompt instead of
/// organization details.
#[derive(Template, WebTemplate)]
#[template(path = "company_profile.html")]
pub struct CompanyProfileTemplate {
    pub signed_in: Option<Identity>,
    pub identity: Identity,
}

/// `GET /company-profile`
pub async fn company_profile(RequireAuth(identity): RequireAuth) -> impl IntoResponse {
    CompanyProfileTemplate {
        signed_in: Some(identity.clone()),
        identity,
    }
}
