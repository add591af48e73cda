//! `PostgreSQL`-backed identity provider.

use argon2::Argon2;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;

use open_impact_core::{AccountType, Email, Identity};

use super::password::{hash_password, verify_password};
use super::provider::{Credentials, ExternalProfile, IdentityProvider, external_display_name};
use super::registration::Registration;
use super::AuthError;
use crate::db::{AccountRepository, RepositoryError};

/// Accounts stored in `open_impact.account`, passwords hashed with Argon2id.
#[derive(Clone)]
pub struct PostgresIdentityProvider {
    pool: PgPool,
}

impl PostgresIdentityProvider {
    /// Create a provider over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn accounts(&self) -> AccountRepository<'_> {
        AccountRepository::new(&self.pool)
    }

    async fn authenticate_password(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = Email::parse(email)?;

        let (identity, password_hash) = self
            .accounts()
            .get_with_password(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let password_hash = password_hash.ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        Ok(identity)
    }

    async fn authenticate_external(&self, profile: &ExternalProfile) -> Result<Identity, AuthError> {
        let accounts = self.accounts();

        if let Some(identity) = accounts
            .get_by_external(&profile.provider, &profile.subject)
            .await?
        {
            return Ok(identity);
        }

        if !profile.email_verified {
            return Err(AuthError::UnverifiedEmail);
        }
        let email = Email::parse(&profile.email)?;

        let identity = if let Some(existing) = accounts.get_by_email(&email).await? {
            existing
        } else {
            let name = external_display_name(profile, email.local_part());
            let mut identity = Identity::new(name, email, AccountType::Individual);
            identity.image.clone_from(&profile.image);
            accounts.create(&identity, None).await.map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;
            tracing::info!(
                identity_id = %identity.id,
                provider = %profile.provider,
                "Created account from external sign-in"
            );
            identity
        };

        accounts
            .link_external(&profile.provider, &profile.subject, identity.id)
            .await?;
        Ok(identity)
    }
}

#[async_trait]
impl IdentityProvider for PostgresIdentityProvider {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        match credentials {
            Credentials::Password { email, password } => {
                self.authenticate_password(email, password.expose_secret())
                    .await
            }
            Credentials::External(profile) => self.authenticate_external(profile).await,
        }
    }

    async fn register(&self, registration: &Registration) -> Result<Identity, AuthError> {
        let password_hash =
            hash_password(&Argon2::default(), registration.password.expose_secret())?;
        let identity = registration.to_identity();

        self.accounts()
            .create(&identity, Some(&password_hash))
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        Ok(identity)
    }

    async fn update_profile(&self, identity: &Identity) -> Result<(), AuthError> {
        self.accounts()
            .update_profile(identity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::AccountNotFound,
                other => AuthError::Repository(other),
            })
    }

    async fn is_ready(&self) -> bool {
        match self.accounts().ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Identity database not ready");
                false
            }
        }
    }
}
