//! Account provisioning commands.
//!
//! # Usage
//!
//! ```bash
//! OI_ACCOUNT_PASSWORD=... oi-cli account create -e ada@example.org -n "Ada Lovelace"
//! oi-cli account show -e ada@example.org
//! ```
//!
//! # Environment Variables
//!
//! - `OPEN_IMPACT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `OI_ACCOUNT_PASSWORD` - Password for `account create`

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use open_impact_core::{
    AccountType, AccountTypeError, CompanySize, Email, EmailError, Industry, Organization,
    OrganizationError,
};
use open_impact_web::db::{AccountRepository, RepositoryError};
use open_impact_web::services::auth::password::MIN_PASSWORD_LENGTH;
use open_impact_web::services::auth::{
    AuthError, IdentityProvider, PostgresIdentityProvider, Registration,
};

use super::{ConnectError, connect};

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Could not connect.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Invalid account type.
    #[error("{0}. Valid types: individual, company, nonprofit")]
    InvalidAccountType(#[from] AccountTypeError),

    /// Invalid organization field.
    #[error("Invalid organization: {0}")]
    InvalidOrganization(#[from] OrganizationError),

    /// Company and nonprofit accounts need organization details.
    #[error("--{0} is required for organization accounts")]
    MissingOrganizationField(&'static str),

    /// Blank display name.
    #[error("Name must not be empty")]
    EmptyName,

    /// Password too short.
    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    /// Provider rejected the account.
    #[error("Could not create account: {0}")]
    Auth(#[from] AuthError),

    /// Lookup failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// No account with this email.
    #[error("No account with email: {0}")]
    NotFound(String),
}

/// Arguments of `account create`.
pub struct CreateAccount {
    pub email: String,
    pub name: String,
    pub account_type: String,
    pub organization: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub password: SecretString,
}

impl CreateAccount {
    /// Validate into a [`Registration`].
    fn to_registration(&self) -> Result<Registration, AccountError> {
        let email = Email::parse(&self.email)?;
        let account_type: AccountType = self.account_type.parse()?;

        let name = self.name.trim();
        if name.is_empty() {
            return Err(AccountError::EmptyName);
        }

        if self.password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AccountError::WeakPassword);
        }

        let organization = if account_type.is_organization() {
            let org_name = required(self.organization.as_deref(), "organization")?;
            let industry: Industry = required(self.industry.as_deref(), "industry")?.parse()?;
            let size: CompanySize = required(self.size.as_deref(), "size")?.parse()?;
            Some(Organization::new(org_name, industry, size))
        } else {
            None
        };

        Ok(Registration {
            name: name.to_owned(),
            email,
            password: self.password.clone(),
            account_type,
            organization,
        })
    }
}

fn required<'a>(value: Option<&'a str>, flag: &'static str) -> Result<&'a str, AccountError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AccountError::MissingOrganizationField(flag))
}

/// Create an account with a password.
///
/// # Errors
///
/// Returns `AccountError` if an argument is invalid, the email is taken, or
/// the database is unreachable.
pub async fn create(request: &CreateAccount) -> Result<(), AccountError> {
    let registration = request.to_registration()?;

    let pool = connect().await?;
    let provider = PostgresIdentityProvider::new(pool);

    tracing::info!(
        "Creating {} account: {}",
        registration.account_type,
        registration.email
    );
    let identity = provider.register(&registration).await?;

    tracing::info!(
        "Account created successfully! ID: {}, Email: {}, Type: {}",
        identity.id,
        identity.email,
        identity.account_type
    );
    Ok(())
}

/// Show an account's identity.
///
/// # Errors
///
/// Returns `AccountError::NotFound` if no account has this email.
pub async fn show(email: &str) -> Result<(), AccountError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let identity = AccountRepository::new(&pool)
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AccountError::NotFound(email.to_string()))?;

    tracing::info!("ID:      {}", identity.id);
    tracing::info!("Name:    {}", identity.name);
    tracing::info!("Email:   {}", identity.email);
    tracing::info!("Type:    {}", identity.account_type.label());
    if let Some(organization) = &identity.organization {
        tracing::info!(
            "Org:     {} ({}, {})",
            organization.name,
            organization.industry,
            organization.size.label()
        );
    }
    tracing::info!("Created: {}", identity.created_at);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(account_type: &str) -> CreateAccount {
        CreateAccount {
            email: "Grace@Acme.example".into(),
            name: " Grace Hopper ".into(),
            account_type: account_type.into(),
            organization: None,
            industry: None,
            size: None,
            password: SecretString::from("cobol-1959"),
        }
    }

    #[test]
    fn test_individual_registration() {
        let registration = request("individual").to_registration().unwrap();
        assert_eq!(registration.account_type, AccountType::Individual);
        assert_eq!(registration.name, "Grace Hopper");
        assert!(registration.organization.is_none());
    }

    #[test]
    fn test_company_requires_organization() {
        let err = request("company").to_registration().unwrap_err();
        assert!(matches!(
            err,
            AccountError::MissingOrganizationField("organization")
        ));

        let mut company = request("company");
        company.organization = Some("Acme".into());
        company.industry = Some("technology".into());
        company.size = Some("11-50".into());
        let registration = company.to_registration().unwrap();
        let organization = registration.organization.unwrap();
        assert_eq!(organization.industry, Industry::Technology);
        assert_eq!(organization.size, CompanySize::Small);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            request("admin").to_registration(),
            Err(AccountError::InvalidAccountType(_))
        ));

        let mut short = request("individual");
        short.password = SecretString::from("short");
        assert!(matches!(
            short.to_registration(),
            Err(AccountError::WeakPassword)
        ));

        let mut nameless = request("individual");
        nameless.name = "   ".into();
        assert!(matches!(
            nameless.to_registration(),
            Err(AccountError::EmptyName)
        ));
    }
}
