//! Route guard decisions.
//!
//! Guards are pure: they map a [`SessionState`] plus the page's requirements
//! to a decision. Performing the redirect is the caller's job, which keeps
//! these rules testable without a router.
//!
//! Evaluation order is fixed: loading, then authentication, then account
//! type. Checking the account type first would send anonymous visitors to a
//! dashboard instead of the sign-in page.

use serde::Serialize;

use crate::access::{RequiredTypes, has_access};
use crate::identity::Identity;
use crate::session::SessionState;
use crate::types::AccountType;

/// Query parameter carrying the originally requested path through sign-in.
pub const REDIRECT_PARAM: &str = "redirect";

/// Where guards send people.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardDestinations {
    /// Combined sign-in / sign-up page.
    pub sign_in: String,
    /// Public landing page.
    pub landing: String,
    /// Default dashboard for individual identities.
    pub individual_dashboard: String,
    /// Default dashboard for company identities.
    pub company_dashboard: String,
    /// Default dashboard for nonprofit identities.
    pub nonprofit_dashboard: String,
}

impl Default for GuardDestinations {
    fn default() -> Self {
        Self {
            sign_in: "/auth".to_owned(),
            landing: "/".to_owned(),
            individual_dashboard: "/dashboard".to_owned(),
            company_dashboard: "/company-dashboard".to_owned(),
            nonprofit_dashboard: "/dashboard".to_owned(),
        }
    }
}

impl GuardDestinations {
    /// Default dashboard for an account type.
    #[must_use]
    pub fn dashboard_for(&self, account_type: AccountType) -> &str {
        match account_type {
            AccountType::Individual => &self.individual_dashboard,
            AccountType::Company => &self.company_dashboard,
            AccountType::Nonprofit => &self.nonprofit_dashboard,
        }
    }

    /// Sign-in URL that returns to `requested` afterwards.
    #[must_use]
    pub fn sign_in_url(&self, requested: &str) -> String {
        if is_safe_redirect(requested) && path_of(requested) != self.sign_in {
            format!(
                "{}?{REDIRECT_PARAM}={}",
                self.sign_in,
                urlencoding::encode(requested)
            )
        } else {
            self.sign_in.clone()
        }
    }
}

/// Outcome of evaluating a [`RouteGuard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; show a placeholder and re-evaluate later.
    Checking,
    /// No identity; go to the sign-in page.
    DeniedUnauthenticated {
        /// Sign-in URL including the return destination.
        redirect: String,
    },
    /// Identity present but its account type is not accepted here.
    DeniedWrongAccountType {
        /// Destination appropriate for the identity's account type.
        redirect: String,
    },
    /// Render the page for this identity.
    Granted(Identity),
}

impl GuardDecision {
    /// The redirect target, for denied decisions.
    #[must_use]
    pub fn redirect(&self) -> Option<&str> {
        match self {
            Self::DeniedUnauthenticated { redirect }
            | Self::DeniedWrongAccountType { redirect } => Some(redirect),
            Self::Checking | Self::Granted(_) => None,
        }
    }

    /// Whether the page may render.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Flat per-render view of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardResult {
    pub loading: bool,
    pub authenticated: bool,
    pub identity: Option<Identity>,
    pub has_access: bool,
}

impl GuardResult {
    /// Evaluate `state` against an optional account-type requirement.
    #[must_use]
    pub fn evaluate(state: &SessionState, required: Option<RequiredTypes>) -> Self {
        if state.is_loading() {
            return Self {
                loading: true,
                authenticated: false,
                identity: None,
                has_access: false,
            };
        }

        let identity = state.identity();
        Self {
            loading: false,
            authenticated: identity.is_some(),
            identity: identity.cloned(),
            has_access: has_access(identity, required),
        }
    }
}

/// Guard for pages that need a signed-in identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGuard {
    required: Option<RequiredTypes>,
    fallback: Option<String>,
    destinations: GuardDestinations,
}

impl RouteGuard {
    /// Any authenticated identity may pass.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Only identities whose account type is in `required` may pass.
    #[must_use]
    pub fn account_types(required: impl Into<RequiredTypes>) -> Self {
        Self {
            required: Some(required.into()),
            ..Self::default()
        }
    }

    /// Send wrong-account-type identities here instead of their dashboard.
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Override the destination table.
    #[must_use]
    pub fn with_destinations(mut self, destinations: GuardDestinations) -> Self {
        self.destinations = destinations;
        self
    }

    /// The account-type requirement, if any.
    #[must_use]
    pub const fn required(&self) -> Option<RequiredTypes> {
        self.required
    }

    /// Evaluate the guard for a request to `requested` (path plus query).
    #[must_use]
    pub fn decide(&self, state: &SessionState, requested: &str) -> GuardDecision {
        if state.is_loading() {
            return GuardDecision::Checking;
        }

        let Some(identity) = state.identity() else {
            return GuardDecision::DeniedUnauthenticated {
                redirect: self.destinations.sign_in_url(requested),
            };
        };

        if !has_access(Some(identity), self.required) {
            let target = self
                .fallback
                .as_deref()
                .unwrap_or_else(|| self.destinations.dashboard_for(identity.account_type));

            let redirect = if path_of(target) == path_of(requested) {
                self.destinations.landing.clone()
            } else {
                target.to_owned()
            };
            return GuardDecision::DeniedWrongAccountType { redirect };
        }

        GuardDecision::Granted(identity.clone())
    }
}

/// Outcome of evaluating a [`GuestGuard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestDecision {
    /// Session still resolving.
    Checking,
    /// Already signed in; leave the page.
    Redirect(String),
    /// Anonymous; render the page.
    Render,
}

/// Guard for pages only anonymous visitors should see (sign-in / sign-up).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestGuard {
    destinations: GuardDestinations,
}

impl GuestGuard {
    /// Guest guard with a custom destination table.
    #[must_use]
    pub const fn new(destinations: GuardDestinations) -> Self {
        Self { destinations }
    }

    /// Evaluate with the (already decoded) `redirect` query parameter.
    #[must_use]
    pub fn decide(&self, state: &SessionState, redirect_param: Option<&str>) -> GuestDecision {
        if state.is_loading() {
            return GuestDecision::Checking;
        }

        match state.identity() {
            None => GuestDecision::Render,
            Some(identity) => GuestDecision::Redirect(
                self.destinations
                    .post_sign_in(identity.account_type, redirect_param),
            ),
        }
    }
}

impl GuardDestinations {
    /// Where to land after signing in: the requested page if it is a safe
    /// local path (and not the sign-in page itself), otherwise the dashboard.
    #[must_use]
    pub fn post_sign_in(&self, account_type: AccountType, redirect_param: Option<&str>) -> String {
        redirect_param
            .map(str::trim)
            .filter(|target| is_safe_redirect(target) && path_of(target) != self.sign_in)
            .map_or_else(
                || self.dashboard_for(account_type).to_owned(),
                str::to_owned,
            )
    }
}

/// Whether `target` is a local path that is safe to redirect to.
///
/// Rejects absolute and scheme-relative URLs (`//host`), backslashes (which
/// some browsers treat as slashes) and control characters.
#[must_use]
pub fn is_safe_redirect(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.contains('\\')
        && !target.chars().any(char::is_control)
}

fn path_of(target: &str) -> &str {
    target.split(['?', '#']).next().unwrap_or(target)
}
