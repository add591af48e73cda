//! OpenID Connect authorization-code client.
//!
//! The provider's userinfo endpoint is the source of the external profile;
//! the ID token is not parsed.

use std::time::Duration;

use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use open_impact_core::normalize_link;

use crate::config::OAuthConfig;
use crate::services::auth::ExternalProfile;

const SCOPES: &str = "openid email profile";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the OAuth round trip.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Transport failure talking to the provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A configured endpoint is not a valid URL.
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The provider answered with an error status.
    #[error("provider returned {status}: {body}")]
    Provider {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The provider did not share an email address.
    #[error("provider profile has no email")]
    MissingEmail,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// `OpenID` Connect userinfo claims.
#[derive(Debug, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl UserInfo {
    /// Map claims to an external profile for `provider`.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::MissingEmail` if no email was shared. A picture
    /// that is not an http(s) address is dropped.
    pub fn into_profile(self, provider: &str) -> Result<ExternalProfile, OAuthError> {
        let email = self
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or(OAuthError::MissingEmail)?;

        Ok(ExternalProfile {
            provider: provider.to_owned(),
            subject: self.sub,
            email,
            email_verified: self.email_verified.unwrap_or(false),
            name: self.name,
            image: self.picture.and_then(|picture| normalize_link(&picture).ok()),
        })
    }
}

/// Client for one configured provider.
#[derive(Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl OAuthClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::InvalidUrl` if an endpoint is malformed, or
    /// `OAuthError::Http` if the HTTP client cannot be built.
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthError> {
        for endpoint in [&config.authorize_url, &config.token_url, &config.userinfo_url] {
            url::Url::parse(endpoint)?;
        }

        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self { config, http })
    }

    /// Provider label.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.config.provider_name
    }

    /// URL to send the browser to.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::InvalidUrl` if the authorize endpoint is malformed.
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        nonce: &str,
    ) -> Result<String, OAuthError> {
        let url = url::Url::parse_with_params(
            &self.config.authorize_url,
            [
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", SCOPES),
                ("state", state),
                ("nonce", nonce),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::Provider` on an error status, `OAuthError::Http`
    /// on transport or decoding failure.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, OAuthError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
            ])
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    /// Fetch the signed-in user's claims.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::Provider` on an error status, `OAuthError::Http`
    /// on transport or decoding failure.
    pub async fn userinfo(&self, access_token: &str) -> Result<UserInfo, OAuthError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, OAuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(OAuthError::Provider { status, body })
}

/// Random alphanumeric string for `state` and `nonce`.
#[must_use]
pub fn random_token(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn client() -> OAuthClient {
        OAuthClient::new(OAuthConfig {
            provider_name: "google".into(),
            client_id: "oi-client".into(),
            client_secret: SecretString::from("s3cr3t-value"),
            authorize_url: "https://accounts.example.com/o/oauth2/auth".into(),
            token_url: "https://oauth2.example.com/token".into(),
            userinfo_url: "https://openid.example.com/userinfo".into(),
        })
        .unwrap()
    }

    #[test]
    fn test_authorization_url() {
        let url = client()
            .authorization_url("https://oi.example.org/auth/oauth/callback", "st4te", "n0nce")
            .unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

        assert_eq!(parsed.host_str(), Some("accounts.example.com"));
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "oi-client");
        assert_eq!(
            params["redirect_uri"],
            "https://oi.example.org/auth/oauth/callback"
        );
        assert_eq!(params["scope"], "openid email profile");
        assert_eq!(params["state"], "st4te");
        assert_eq!(params["nonce"], "n0nce");
        assert!(!url.contains("s3cr3t"));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = OAuthClient::new(OAuthConfig {
            provider_name: "google".into(),
            client_id: "oi-client".into(),
            client_secret: SecretString::from("s3cr3t-value"),
            authorize_url: "not a url".into(),
            token_url: "https://oauth2.example.com/token".into(),
            userinfo_url: "https://openid.example.com/userinfo".into(),
        });
        assert!(matches!(result, Err(OAuthError::InvalidUrl(_))));
    }

    #[test]
    fn test_userinfo_into_profile() {
        let info: UserInfo = serde_json::from_value(serde_json::json!({
            "sub": "1234567890",
            "email": "ada@example.org",
            "email_verified": true,
            "name": "Ada Lovelace",
            "picture": "https://lh3.example.com/a.png"
        }))
        .unwrap();

        let profile = info.into_profile("google").unwrap();
        assert_eq!(profile.provider, "google");
        assert_eq!(profile.subject, "1234567890");
        assert!(profile.email_verified);
        assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.image.as_deref(), Some("https://lh3.example.com/a.png"));
    }

    #[test]
    fn test_userinfo_drops_script_picture() {
        let info: UserInfo = serde_json::from_value(serde_json::json!({
            "sub": "1",
            "email": "ada@example.org",
            "picture": "javascript:alert(1)"
        }))
        .unwrap();

        assert_eq!(info.into_profile("google").unwrap().image, None);
    }

    #[test]
    fn test_userinfo_without_email() {
        let info: UserInfo = serde_json::from_value(serde_json::json!({"sub": "1"})).unwrap();
        assert!(matches!(
            info.into_profile("google"),
            Err(OAuthError::MissingEmail)
        ));
    }

    #[test]
    fn test_random_token() {
        let a = random_token(32);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, random_token(32));
    }
}
