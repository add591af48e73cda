//! Authentication route handlers.
//!
//! One page hosts sign-in and both sign-up forms. Sign-up validation errors
//! are rendered inline; sign-in failures redirect back with `?error=<code>`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use open_impact_core::{AccountType, CompanySize, Identity, Industry, REDIRECT_PARAM};

use crate::filters;
use crate::middleware::RedirectIfAuthenticated;
use crate::services::AuthSession;
use crate::services::auth::{
    AuthError, Credentials, IndividualSignUpForm, OrganizationSignUpForm, Registration,
    RegistrationErrors, message_for_code,
};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    pub redirect: Option<String>,
}

/// Query parameters for the auth page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthPageQuery {
    pub error: Option<String>,
    pub tab: Option<String>,
}

/// Which form the auth page shows first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTab {
    SignIn,
    Individual,
    Organization,
}

impl AuthTab {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("individual") => Self::Individual,
            Some("organization") => Self::Organization,
            _ => Self::SignIn,
        }
    }

    /// Query value for this tab.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignIn => "sign-in",
            Self::Individual => "individual",
            Self::Organization => "organization",
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Combined sign-in / sign-up page.
#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    pub signed_in: Option<Identity>,
    pub error: Option<&'static str>,
    pub tab: AuthTab,
    pub redirect: Option<String>,
    pub individual: IndividualSignUpForm,
    pub organization: OrganizationSignUpForm,
    pub errors: RegistrationErrors,
    pub oauth_provider: Option<String>,
    pub industries: &'static [Industry],
    pub sizes: &'static [CompanySize],
}

impl AuthTemplate {
    fn new(state: &AppState, tab: AuthTab, redirect: Option<String>) -> Self {
        Self {
            signed_in: None,
            error: None,
            tab,
            redirect,
            individual: IndividualSignUpForm::default(),
            organization: OrganizationSignUpForm {
                account_type: AccountType::Company.as_str().to_owned(),
                ..OrganizationSignUpForm::default()
            },
            errors: RegistrationErrors::default(),
            oauth_provider: state
                .oauth()
                .map(|client| client.provider_name().to_owned()),
            industries: &Industry::ALL,
            sizes: &CompanySize::ALL,
        }
    }

    /// Whether `value` is the option already chosen in a select field.
    #[allow(clippy::unused_self)]
    fn is_selected(&self, current: &str, value: impl std::fmt::Display) -> bool {
        !current.is_empty() && current == value.to_string()
    }

    /// OAuth start link, carrying the redirect target.
    fn oauth_login_url(&self) -> String {
        match self.redirect.as_deref().filter(|r| !r.is_empty()) {
            Some(redirect) => format!(
                "/auth/oauth/login?{REDIRECT_PARAM}={}",
                urlencoding::encode(redirect)
            ),
            None => "/auth/oauth/login".to_owned(),
        }
    }

    fn with_status(self, status: StatusCode) -> Response {
        (status, self).into_response()
    }
}

/// `/auth?error=<code>[&tab=..][&redirect=..]`
fn auth_error_url(code: &str, tab: AuthTab, redirect: Option<&str>) -> String {
    let mut url = format!("/auth?error={code}");
    if tab != AuthTab::SignIn {
        url.push_str("&tab=");
        url.push_str(tab.as_str());
    }
    if let Some(redirect) = redirect.filter(|r| !r.is_empty()) {
        url.push('&');
        url.push_str(REDIRECT_PARAM);
        url.push('=');
        url.push_str(&urlencoding::encode(redirect));
    }
    url
}

fn log_failure(action: &str, err: &AuthError) {
    if err.is_client_error() {
        tracing::warn!(action, code = err.code(), "Auth rejected: {}", err);
    } else {
        tracing::error!(action, error = %err, "Auth failed");
    }
}

// =============================================================================
// Auth Page
// =============================================================================

/// Display the sign-in / sign-up page.
pub async fn auth_page(
    State(state): State<AppState>,
    RedirectIfAuthenticated(redirect): RedirectIfAuthenticated,
    Query(query): Query<AuthPageQuery>,
) -> impl IntoResponse {
    let mut page = AuthTemplate::new(&state, AuthTab::parse(query.tab.as_deref()), redirect);
    page.error = query.error.as_deref().map(message_for_code);
    page
}

// =============================================================================
// Sign In / Sign Out
// =============================================================================

/// Handle sign-in form submission.
pub async fn sign_in(
    State(state): State<AppState>,
    auth: AuthSession,
    Form(form): Form<SignInForm>,
) -> Response {
    let credentials = Credentials::password(form.email, form.password);
    let result = auth.lock().await.sign_in(&credentials).await;

    match result {
        Ok(identity) => Redirect::to(
            &state
                .destinations()
                .post_sign_in(identity.account_type, form.redirect.as_deref()),
        )
        .into_response(),
        Err(e) => {
            log_failure("sign_in", &e);
            Redirect::to(&auth_error_url(
                e.code(),
                AuthTab::SignIn,
                form.redirect.as_deref(),
            ))
            .into_response()
        }
    }
}

/// Sign out and return to the landing page.
pub async fn sign_out(auth: AuthSession) -> Redirect {
    let landing = auth.lock().await.sign_out().await;
    Redirect::to(&landing)
}

// =============================================================================
// Sign Up
// =============================================================================

/// Handle the individual sign-up form.
pub async fn sign_up(
    State(state): State<AppState>,
    auth: AuthSession,
    Form(form): Form<IndividualSignUpForm>,
) -> Response {
    let redirect = form.redirect.clone();
    let rerender = |errors: RegistrationErrors| {
        let mut page = AuthTemplate::new(&state, AuthTab::Individual, redirect.clone());
        page.individual = form.without_passwords();
        page.errors = errors;
        page
    };

    match form.validate() {
        Ok(registration) => {
            register(
                &state,
                &auth,
                &registration,
                AuthTab::Individual,
                redirect.as_deref(),
                rerender,
            )
            .await
        }
        Err(errors) => rerender(errors).with_status(StatusCode::UNPROCESSABLE_ENTITY),
    }
}

/// Handle the company / nonprofit sign-up form.
pub async fn sign_up_organization(
    State(state): State<AppState>,
    auth: AuthSession,
    Form(form): Form<OrganizationSignUpForm>,
) -> Response {
    let redirect = form.redirect.clone();
    let rerender = |errors: RegistrationErrors| {
        let mut page = AuthTemplate::new(&state, AuthTab::Organization, redirect.clone());
        page.organization = form.without_passwords();
        page.errors = errors;
        page
    };

    match form.validate() {
        Ok(registration) => {
            register(
                &state,
                &auth,
                &registration,
                AuthTab::Organization,
                redirect.as_deref(),
                rerender,
            )
            .await
        }
        Err(errors) => rerender(errors).with_status(StatusCode::UNPROCESSABLE_ENTITY),
    }
}

async fn register(
    state: &AppState,
    auth: &AuthSession,
    registration: &Registration,
    tab: AuthTab,
    redirect: Option<&str>,
    rerender: impl FnOnce(RegistrationErrors) -> AuthTemplate,
) -> Response {
    let result = auth.lock().await.sign_up(registration).await;

    match result {
        Ok(identity) => Redirect::to(
            &state
                .destinations()
                .post_sign_in(identity.account_type, redirect),
        )
        .into_response(),
        Err(AuthError::EmailTaken) => {
            tracing::info!("Sign-up with an existing email");
            rerender(RegistrationErrors::single(
                "email",
                message_for_code(AuthError::EmailTaken.code()),
            ))
            .with_status(StatusCode::CONFLICT)
        }
        Err(e) => {
            log_failure("sign_up", &e);
            Redirect::to(&auth_error_url(e.code(), tab, redirect)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_url() {
        assert_eq!(
            auth_error_url("credentials", AuthTab::SignIn, None),
            "/auth?error=credentials"
        );
        assert_eq!(
            auth_error_url("unavailable", AuthTab::Organization, Some("/company-profile?x=1")),
            "/auth?error=unavailable&tab=organization&redirect=%2Fcompany-profile%3Fx%3D1"
        );
        assert_eq!(
            auth_error_url("session", AuthTab::Individual, Some("")),
            "/auth?error=session&tab=individual"
        );
    }

    #[test]
    fn test_auth_tab_parse() {
        assert_eq!(AuthTab::parse(Some("individual")), AuthTab::Individual);
        assert_eq!(AuthTab::parse(Some("organization")), AuthTab::Organization);
        assert_eq!(AuthTab::parse(Some("bogus")), AuthTab::SignIn);
        assert_eq!(AuthTab::parse(None), AuthTab::SignIn);
    }

    fn page(redirect: Option<&str>) -> AuthTemplate {
        AuthTemplate {
            signed_in: None,
            error: None,
            tab: AuthTab::Organization,
            redirect: redirect.map(str::to_owned),
            individual: IndividualSignUpForm::default(),
            organization: OrganizationSignUpForm::default(),
            errors: RegistrationErrors::default(),
            oauth_provider: Some("google".into()),
            industries: &Industry::ALL,
            sizes: &CompanySize::ALL,
        }
    }

    #[test]
    fn test_oauth_login_url() {
        assert_eq!(page(None).oauth_login_url(), "/auth/oauth/login");
        assert_eq!(
            page(Some("/company-dashboard")).oauth_login_url(),
            "/auth/oauth/login?redirect=%2Fcompany-dashboard"
        );
    }

    #[test]
    fn test_is_selected() {
        let page = page(None);
        assert!(page.is_selected("Technology", Industry::Technology));
        assert!(page.is_selected("11-50", CompanySize::Small));
        assert!(!page.is_selected("", ""));
        assert!(!page.is_selected("Retail", Industry::Other));
    }
}
