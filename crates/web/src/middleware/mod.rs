//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with `request_id` and `identity_id`)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions cookie + store)
//! 5. Session context (per-request `AuthSession`, hydrated)
//! 6. Rate limiting on auth form posts (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{
    AccountTypePolicy, AuthRejection, CompanyOnly, OptionalAuth, PeopleOnly,
    RedirectIfAuthenticated, RequireAccountType, RequireAuth,
};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer, session_context_middleware};
