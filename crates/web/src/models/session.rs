//! Session record layout.
//!
//! Everything the site keeps in a visitor's tower-sessions record.

/// Session keys.
pub mod keys {
    /// JSON-serialized [`open_impact_core::Identity`] of the signed-in principal.
    pub const USER: &str = "openimpact_user";

    /// `true` while the record above is a valid sign-in.
    pub const AUTHENTICATED: &str = "openimpact_auth";

    /// OAuth state parameter (CSRF protection).
    pub const OAUTH_STATE: &str = "openimpact_oauth_state";

    /// OAuth nonce (`OpenID` Connect replay protection).
    pub const OAUTH_NONCE: &str = "openimpact_oauth_nonce";

    /// Local path to return to after the OAuth round trip.
    pub const OAUTH_RETURN_TO: &str = "openimpact_oauth_return_to";
}
