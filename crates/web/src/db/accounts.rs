//! Account repository.
//!
//! Queries are built at runtime so the crate compiles without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use open_impact_core::{AccountType, Email, Identity, IdentityId, Organization};

use super::RepositoryError;

const ACCOUNT_COLUMNS: &str =
    "id, email, name, image, account_type, organization, permissions, created_at";

/// Raw `open_impact.account` row.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    name: String,
    image: Option<String>,
    account_type: String,
    organization: Option<Json<Organization>>,
    permissions: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Identity {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let account_type: AccountType = row.account_type.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid account type in database: {e}"))
        })?;

        Ok(Self {
            id: IdentityId::new(row.id),
            name: row.name,
            email,
            image: row.image,
            account_type,
            organization: row.organization.map(|Json(org)| org),
            permissions: row.permissions,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PasswordRow {
    #[sqlx(flatten)]
    account: AccountRow,
    password_hash: Option<String>,
}

/// Repository for account database operations.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an account and its password hash (if any) by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(Identity, Option<String>)>, RepositoryError> {
        let row = sqlx::query_as::<_, PasswordRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS}, password_hash FROM open_impact.account WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((Identity::try_from(r.account)?, r.password_hash)))
            .transpose()
    }

    /// Get an account by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Identity>, RepositoryError> {
        Ok(self.get_with_password(email).await?.map(|(identity, _)| identity))
    }

    /// Get the account linked to an external provider subject.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_external(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<Identity>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r"
            SELECT {ACCOUNT_COLUMNS}
            FROM open_impact.account
            WHERE id = (
                SELECT account_id FROM open_impact.external_login
                WHERE provider = $1 AND subject = $2
            )
            "
        ))
        .bind(provider)
        .bind(subject)
        .fetch_optional(self.pool)
        .await?;

        row.map(Identity::try_from).transpose()
    }

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        identity: &Identity,
        password_hash: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO open_impact.account
                (id, email, name, image, account_type, organization, permissions,
                 password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(identity.id.as_uuid())
        .bind(identity.email.as_str())
        .bind(&identity.name)
        .bind(identity.image.as_deref())
        .bind(identity.account_type.as_str())
        .bind(identity.organization.as_ref().map(Json))
        .bind(&identity.permissions)
        .bind(password_hash)
        .bind(identity.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    /// Link an external provider subject to an account.
    ///
    /// Re-linking the same subject is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn link_external(
        &self,
        provider: &str,
        subject: &str,
        account_id: IdentityId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO open_impact.external_login (provider, subject, account_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (provider, subject) DO NOTHING
            ",
        )
        .bind(provider)
        .bind(subject)
        .bind(account_id.as_uuid())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Persist the mutable profile fields of an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_profile(&self, identity: &Identity) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE open_impact.account
            SET name = $2, image = $3, organization = $4, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(identity.id.as_uuid())
        .bind(&identity.name)
        .bind(identity.image.as_deref())
        .bind(identity.organization.as_ref().map(Json))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Check that the database answers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(self.pool).await?;
        Ok(())
    }
}
