//! Dashboards, one per audience.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use open_impact_core::Identity;

use crate::filters;
use crate::middleware::{CompanyOnly, PeopleOnly, RequireAccountType};

/// Individual / nonprofit dashboard.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub signed_in: Option<Identity>,
    pub identity: Identity,
}

/// Company dashboard.
#[derive(Template, WebTemplate)]
#[template(path = "company_dashboard.html")]
pub struct CompanyDashboardTemplate {
    pub signed_in: Option<Identity>,
    pub identity: Identity,
}

/// `GET /dashboard`
pub async fn dashboard(
    RequireAccountType(identity, ..): RequireAccountType<PeopleOnly>,
) -> impl IntoResponse {
    DashboardTemplate {
        signed_in: Some(identity.clone()),
        identity,
    }
}

/// `GET /company-dashboard`
pub async fn company_dashboard(
    RequireAccountType(identity, ..): RequireAccountType<CompanyOnly>,
) -> impl IntoResponse {
    CompanyDashboardTemplate {
        signed_in: Some(identity.clone()),
        identity,
    }
}
