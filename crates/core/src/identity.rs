//! The signed-in principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AccountType, Email, IdentityId, LinkError, Organization, normalize_link};

/// Profile data of the authenticated principal.
///
/// This is the record persisted in the session under
/// `openimpact_user`, so its JSON shape is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Unique identity ID.
    pub id: IdentityId,
    /// Display name.
    pub name: String,
    /// Email address (normalized).
    pub email: Email,
    /// Profile image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Account-type tag used by the account-type gate.
    pub account_type: AccountType,
    /// Organization for company and nonprofit identities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    /// Granted permissions.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// When the underlying account was created.
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Create an identity with a fresh ID and no organization or permissions.
    #[must_use]
    pub fn new(name: impl Into<String>, email: Email, account_type: AccountType) -> Self {
        Self {
            id: IdentityId::generate(),
            name: name.into(),
            email,
            image: None,
            account_type,
            organization: None,
            permissions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach an organization.
    #[must_use]
    pub fn with_organization(mut self, organization: Organization) -> Self {
        self.organization = Some(organization);
        self
    }

    /// Attach a profile image URL.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Merge a partial update into this identity.
    ///
    /// Links (`image`, `website`) are validated with [`normalize_link`]
    /// before anything is changed. Returns `true` if any field changed.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` naming the first invalid link; the identity
    /// is left untouched.
    pub fn apply(&mut self, update: &IdentityUpdate) -> Result<bool, ProfileError> {
        let image = update
            .image
            .as_deref()
            .map(|value| optional_link("image", value))
            .transpose()?;
        let website = match (&self.organization, update.website.as_deref()) {
            (Some(_), Some(value)) => Some(optional_link("website", value)?),
            _ => None,
        };

        let before = self.clone();

        if let Some(name) = non_blank(update.name.as_deref()) {
            self.name = name.to_owned();
        }

        if let Some(image) = image {
            self.image = image;
        }

        if let Some(organization) = self.organization.as_mut() {
            if let Some(name) = non_blank(update.organization_name.as_deref()) {
                name.clone_into(&mut organization.name);
            }
            if let Some(website) = website {
                organization.website = website;
            }
            if let Some(title) = update.contact_title.as_deref() {
                organization.contact_title = non_blank(Some(title)).map(str::to_owned);
            }
        }

        Ok(*self != before)
    }
}

/// A profile field rejected by [`Identity::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {source}")]
pub struct ProfileError {
    /// Form field name (`image` or `website`).
    pub field: &'static str,
    pub source: LinkError,
}

/// Blank clears the link; anything else must be a web address.
fn optional_link(field: &'static str, value: &str) -> Result<Option<String>, ProfileError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    normalize_link(value)
        .map(Some)
        .map_err(|source| ProfileError { field, source })
}

/// Partial profile update.
///
/// Absent fields are left untouched. For the optional attributes (`image`,
/// `website`, `contact_title`) a blank string clears the value; a blank
/// `name` or `organization_name` is ignored. Organization fields only apply
/// to identities that have an organization. `image` and `website` must be
/// `http`/`https` addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
    pub organization_name: Option<String>,
    pub website: Option<String>,
    pub contact_title: Option<String>,
}

impl IdentityUpdate {
    /// Whether the update carries no fields at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.image.is_none()
            && self.organization_name.is_none()
            && self.website.is_none()
            && self.contact_title.is_none()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{CompanySize, Industry};

    fn company() -> Identity {
        Identity::new(
            "Grace Hopper",
            Email::parse("grace@acme.org").unwrap(),
            AccountType::Company,
        )
        .with_organization(Organization::new(
            "Acme",
            Industry::Technology,
            CompanySize::Medium,
        ))
    }

    #[test]
    fn test_apply_merges_present_fields_only() {
        let mut identity = company();
        let changed = identity
            .apply(&IdentityUpdate {
                name: Some("Grace B. Hopper".into()),
                website: Some("https://acme.org".into()),
                ..IdentityUpdate::default()
            })
            .unwrap();

        assert!(changed);
        assert_eq!(identity.name, "Grace B. Hopper");
        let org = identity.organization.as_ref().unwrap();
        assert_eq!(org.name, "Acme");
        assert_eq!(org.website.as_deref(), Some("https://acme.org"));
    }

    #[test]
    fn test_apply_blank_clears_optional_and_ignores_required() {
        let mut identity = company().with_image("https://cdn.example.org/a.png");
        identity
            .apply(&IdentityUpdate {
                name: Some("   ".into()),
                image: Some(String::new()),
                ..IdentityUpdate::default()
            })
            .unwrap();

        assert_eq!(identity.name, "Grace Hopper");
        assert_eq!(identity.image, None);
    }

    #[test]
    fn test_apply_org_fields_ignored_without_organization() {
        let mut identity = Identity::new(
            "Ada",
            Email::parse("ada@example.org").unwrap(),
            AccountType::Individual,
        );
        let changed = identity
            .apply(&IdentityUpdate {
                organization_name: Some("Analytical Engines".into()),
                website: Some("javascript:alert(1)".into()),
                ..IdentityUpdate::default()
            })
            .unwrap();

        assert!(!changed);
        assert!(identity.organization.is_none());
    }

    #[test]
    fn test_json_roundtrip_keeps_every_field() {
        let mut identity = company().with_image("https://cdn.example.org/g.png");
        identity.permissions.push("reports:write".into());

        let json = serde_json::to_string(&identity).unwrap();
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
        assert_eq!(back.permissions, ["reports:write"]);
    }

    #[test]
    fn test_apply_rejects_script_links_without_changes() {
        let mut identity = company().with_image("https://cdn.example.org/g.png");
        let before = identity.clone();

        let err = identity
            .apply(&IdentityUpdate {
                name: Some("Mallory".into()),
                website: Some("javascript:alert(document.domain)".into()),
                ..IdentityUpdate::default()
            })
            .unwrap_err();
        assert_eq!(err.field, "website");
        assert_eq!(identity, before);

        let err = identity
            .apply(&IdentityUpdate {
                image: Some("data:image/svg+xml,<svg onload=alert(1)>".into()),
                ..IdentityUpdate::default()
            })
            .unwrap_err();
        assert_eq!(err.field, "image");
        assert_eq!(identity, before);
    }

    #[test]
    fn test_apply_normalizes_bare_domain() {
        let mut identity = company();
        identity
            .apply(&IdentityUpdate {
                website: Some(" acme.org ".into()),
                ..IdentityUpdate::default()
            })
            .unwrap();
        assert_eq!(
            identity.organization.unwrap().website.as_deref(),
            Some("https://acme.org")
        );
    }

    #[test]
    fn test_json_uses_camel_case() {
        let json = serde_json::to_value(company()).unwrap();
        assert_eq!(json["accountType"], "company");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_update_is_empty() {
        assert!(IdentityUpdate::default().is_empty());
        assert!(
            !IdentityUpdate {
                image: Some(String::new()),
                ..IdentityUpdate::default()
            }
            .is_empty()
        );
    }
}
