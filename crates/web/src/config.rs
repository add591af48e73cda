//! Web configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `OPEN_IMPACT_BASE_URL` - Public URL of the site (cookie `Secure` flag, OAuth redirect URI)
//! - `OPEN_IMPACT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; only required for the `postgres` identity backend)
//!
//! ## Optional
//! - `OPEN_IMPACT_HOST` - Bind address (default: 127.0.0.1)
//! - `OPEN_IMPACT_PORT` - Listen port (default: 3000)
//! - `OPEN_IMPACT_IDENTITY_BACKEND` - `postgres` (default) or `memory`
//! - `OPEN_IMPACT_RATE_LIMIT` - Rate limit auth endpoints (default: true)
//! - `OAUTH_CLIENT_ID` - Enables OAuth sign-in when set
//! - `OAUTH_CLIENT_SECRET` - OAuth client secret (required with `OAUTH_CLIENT_ID`)
//! - `OAUTH_PROVIDER_NAME` - Provider label (default: google)
//! - `OAUTH_AUTHORIZE_URL`, `OAUTH_TOKEN_URL`, `OAUTH_USERINFO_URL` - Endpoints (Google defaults)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where accounts live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityBackend {
    /// Accounts table plus Postgres-backed session records.
    #[default]
    Postgres,
    /// Process-local accounts and sessions, lost on restart.
    Memory,
}

impl std::str::FromStr for IdentityBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected `postgres` or `memory`, got `{other}`")),
        }
    }
}

/// Web application configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Identity and session storage backend
    pub identity_backend: IdentityBackend,
    /// Whether auth endpoints are rate limited
    pub rate_limit: bool,
    /// OAuth sign-in, if configured
    pub oauth: Option<OAuthConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

/// OpenID Connect provider configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Short provider label, stored with linked external accounts
    pub provider_name: String,
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: SecretString,
    /// Authorization endpoint
    pub authorize_url: String,
    /// Token endpoint
    pub token_url: String,
    /// `OpenID` userinfo endpoint
    pub userinfo_url: String,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("provider_name", &self.provider_name)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("OPEN_IMPACT_HOST", "127.0.0.1")?;
        let port = parse_env("OPEN_IMPACT_PORT", "3000")?;
        let base_url = get_required_env("OPEN_IMPACT_BASE_URL")?
            .trim_end_matches('/')
            .to_owned();
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("OPEN_IMPACT_BASE_URL".to_owned(), e.to_string())
        })?;

        let identity_backend: IdentityBackend =
            get_env_or_default("OPEN_IMPACT_IDENTITY_BACKEND", "postgres")
                .parse()
                .map_err(|e| {
                    ConfigError::InvalidEnvVar("OPEN_IMPACT_IDENTITY_BACKEND".to_owned(), e)
                })?;

        let database_url = match identity_backend {
            IdentityBackend::Postgres => Some(get_database_url("OPEN_IMPACT_DATABASE_URL")?),
            IdentityBackend::Memory => None,
        };

        let rate_limit = parse_bool("OPEN_IMPACT_RATE_LIMIT", true)?;
        let oauth = OAuthConfig::from_env()?;
        let sentry_traces_sample_rate = parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;

        Ok(Self {
            host,
            port,
            base_url,
            database_url,
            identity_backend,
            rate_limit,
            oauth,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the site is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Absolute URL for a local path.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl OAuthConfig {
    /// OAuth is enabled by setting `OAUTH_CLIENT_ID`.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(client_id) = get_optional_env("OAUTH_CLIENT_ID") else {
            return Ok(None);
        };

        Ok(Some(Self {
            provider_name: get_env_or_default("OAUTH_PROVIDER_NAME", "google"),
            client_id,
            client_secret: get_validated_secret("OAUTH_CLIENT_SECRET")?,
            authorize_url: get_env_or_default("OAUTH_AUTHORIZE_URL", GOOGLE_AUTHORIZE_URL),
            token_url: get_env_or_default("OAUTH_TOKEN_URL", GOOGLE_TOKEN_URL),
            userinfo_url: get_env_or_default("OAUTH_USERINFO_URL", GOOGLE_USERINFO_URL),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_optional_env(key) {
        None => Ok(default),
        Some(value) => parse_bool_value(&value)
            .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), value)),
    }
}

fn parse_bool_value(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the value issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
