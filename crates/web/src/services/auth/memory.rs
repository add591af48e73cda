//! In-process identity provider for local development and tests.

use std::collections::HashMap;

use argon2::Argon2;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::sync::RwLock;

use open_impact_core::{AccountType, Email, Identity, IdentityId};

use super::password::{hash_password, light_hasher, verify_password};
use super::provider::{Credentials, IdentityProvider, external_display_name};
use super::registration::Registration;
use super::AuthError;

struct Account {
    identity: Identity,
    password_hash: Option<String>,
}

#[derive(Default)]
struct Accounts {
    by_email: HashMap<Email, Account>,
    external: HashMap<(String, String), IdentityId>,
}

/// Accounts held in a process-local map.
///
/// Same semantics as the Postgres provider; everything is lost on restart.
pub struct MemoryIdentityProvider {
    accounts: RwLock<Accounts>,
    hasher: Argon2<'static>,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    /// Empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(Accounts::default()),
            hasher: light_hasher(),
        }
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.by_email.len()
    }

    /// Whether no account exists.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stored identity for `email`.
    pub async fn get(&self, email: &Email) -> Option<Identity> {
        self.accounts
            .read()
            .await
            .by_email
            .get(email)
            .map(|account| account.identity.clone())
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        match credentials {
            Credentials::Password { email, password } => {
                let email = Email::parse(email)?;
                let accounts = self.accounts.read().await;
                let account = accounts
                    .by_email
                    .get(&email)
                    .ok_or(AuthError::InvalidCredentials)?;
                let hash = account
                    .password_hash
                    .as_deref()
                    .ok_or(AuthError::InvalidCredentials)?;

                verify_password(password.expose_secret(), hash)?;
                Ok(account.identity.clone())
            }
            Credentials::External(profile) => {
                let key = (profile.provider.clone(), profile.subject.clone());
                let mut accounts = self.accounts.write().await;

                if let Some(id) = accounts.external.get(&key)
                    && let Some(account) = accounts.by_email.values().find(|a| a.identity.id == *id)
                {
                    return Ok(account.identity.clone());
                }

                if !profile.email_verified {
                    return Err(AuthError::UnverifiedEmail);
                }
                let email = Email::parse(&profile.email)?;

                let identity = match accounts.by_email.get(&email) {
                    Some(account) => account.identity.clone(),
                    None => {
                        let name = external_display_name(profile, email.local_part());
                        let mut identity = Identity::new(name, email.clone(), AccountType::Individual);
                        identity.image.clone_from(&profile.image);
                        accounts.by_email.insert(
                            email,
                            Account {
                                identity: identity.clone(),
                                password_hash: None,
                            },
                        );
                        identity
                    }
                };

                accounts.external.insert(key, identity.id);
                Ok(identity)
            }
        }
    }

    async fn register(&self, registration: &Registration) -> Result<Identity, AuthError> {
        let password_hash = hash_password(&self.hasher, registration.password.expose_secret())?;
        let identity = registration.to_identity();

        let mut accounts = self.accounts.write().await;
        if accounts.by_email.contains_key(&identity.email) {
            return Err(AuthError::EmailTaken);
        }
        accounts.by_email.insert(
            identity.email.clone(),
            Account {
                identity: identity.clone(),
                password_hash: Some(password_hash),
            },
        );

        Ok(identity)
    }

    async fn update_profile(&self, identity: &Identity) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .by_email
            .get_mut(&identity.email)
            .filter(|account| account.identity.id == identity.id)
            .ok_or(AuthError::AccountNotFound)?;

        account.identity.name.clone_from(&identity.name);
        account.identity.image.clone_from(&identity.image);
        account.identity.organization.clone_from(&identity.organization);
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        true
    }
}
