//! Public landing page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};

use open_impact_core::Identity;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub signed_in: Option<Identity>,
    /// Dashboard link for the signed-in identity.
    pub dashboard: Option<String>,
}

/// Display the landing page.
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
) -> impl IntoResponse {
    let dashboard = auth
        .identity
        .as_ref()
        .map(|identity| state.destinations().dashboard_for(identity.account_type).to_owned());

    HomeTemplate {
        signed_in: auth.identity,
        dashboard,
    }
}
