//! Organization reference attached to company and nonprofit identities.

use serde::{Deserialize, Serialize};

use super::id::OrganizationId;

/// Errors that can occur when parsing organization attributes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrganizationError {
    /// The industry is not one of the supported values.
    #[error("unknown industry: {0}")]
    UnknownIndustry(String),
    /// The company size is not one of the supported brackets.
    #[error("unknown company size: {0}")]
    UnknownSize(String),
}

/// Industry an organization operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Technology,
    Healthcare,
    Finance,
    Education,
    Manufacturing,
    Retail,
    Consulting,
    NonProfit,
    Government,
    Energy,
    Transportation,
    Agriculture,
    RealEstate,
    Media,
    Other,
}

impl Industry {
    /// Every industry, in the order offered on the sign-up form.
    pub const ALL: [Self; 15] = [
        Self::Technology,
        Self::Healthcare,
        Self::Finance,
        Self::Education,
        Self::Manufacturing,
        Self::Retail,
        Self::Consulting,
        Self::NonProfit,
        Self::Government,
        Self::Energy,
        Self::Transportation,
        Self::Agriculture,
        Self::RealEstate,
        Self::Media,
        Self::Other,
    ];

    /// Human-readable label, also accepted by [`str::parse`].
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Technology => "Technology",
            Self::Healthcare => "Healthcare",
            Self::Finance => "Finance",
            Self::Education => "Education",
            Self::Manufacturing => "Manufacturing",
            Self::Retail => "Retail",
            Self::Consulting => "Consulting",
            Self::NonProfit => "Non-profit",
            Self::Government => "Government",
            Self::Energy => "Energy",
            Self::Transportation => "Transportation",
            Self::Agriculture => "Agriculture",
            Self::RealEstate => "Real Estate",
            Self::Media => "Media",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for Industry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Industry {
    type Err = OrganizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|industry| industry.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OrganizationError::UnknownIndustry(s.to_owned()))
    }
}

/// Headcount bracket of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompanySize {
    #[serde(rename = "1-10")]
    Micro,
    #[serde(rename = "11-50")]
    Small,
    #[serde(rename = "51-200")]
    Medium,
    #[serde(rename = "201-500")]
    Large,
    #[serde(rename = "501-1000")]
    VeryLarge,
    #[serde(rename = "1001-5000")]
    Enterprise,
    #[serde(rename = "5001+")]
    Global,
}

impl CompanySize {
    /// Every bracket, smallest first.
    pub const ALL: [Self; 7] = [
        Self::Micro,
        Self::Small,
        Self::Medium,
        Self::Large,
        Self::VeryLarge,
        Self::Enterprise,
        Self::Global,
    ];

    /// Compact form used in form values and storage (`"51-200"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Micro => "1-10",
            Self::Small => "11-50",
            Self::Medium => "51-200",
            Self::Large => "201-500",
            Self::VeryLarge => "501-1000",
            Self::Enterprise => "1001-5000",
            Self::Global => "5001+",
        }
    }

    /// Human-readable label (`"51-200 employees"`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Micro => "1-10 employees",
            Self::Small => "11-50 employees",
            Self::Medium => "51-200 employees",
            Self::Large => "201-500 employees",
            Self::VeryLarge => "501-1,000 employees",
            Self::Enterprise => "1,001-5,000 employees",
            Self::Global => "5,001+ employees",
        }
    }
}

impl std::fmt::Display for CompanySize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompanySize {
    type Err = OrganizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == wanted || size.label() == wanted)
            .ok_or_else(|| OrganizationError::UnknownSize(s.to_owned()))
    }
}

/// The organization a company or nonprofit identity acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Stable organization ID.
    pub id: OrganizationId,
    /// Registered organization name.
    pub name: String,
    /// Industry the organization operates in.
    pub industry: Industry,
    /// Headcount bracket.
    pub size: CompanySize,
    /// Public website, if provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Job title of the admin contact who registered the organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_title: Option<String>,
}

impl Organization {
    /// Create an organization with a freshly generated ID.
    #[must_use]
    pub fn new(name: impl Into<String>, industry: Industry, size: CompanySize) -> Self {
        Self {
            id: OrganizationId::generate(),
            name: name.into(),
            industry,
            size,
            website: None,
            contact_title: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_industry_parse_by_label() {
        assert_eq!("Real Estate".parse::<Industry>().unwrap(), Industry::RealEstate);
        assert_eq!("non-profit".parse::<Industry>().unwrap(), Industry::NonProfit);
        assert!(matches!(
            "Mining".parse::<Industry>(),
            Err(OrganizationError::UnknownIndustry(_))
        ));
    }

    #[test]
    fn test_company_size_parse_compact_and_label() {
        assert_eq!("51-200".parse::<CompanySize>().unwrap(), CompanySize::Medium);
        assert_eq!(
            "5,001+ employees".parse::<CompanySize>().unwrap(),
            CompanySize::Global
        );
        assert!("lots".parse::<CompanySize>().is_err());
    }

    #[test]
    fn test_company_size_ordering() {
        assert!(CompanySize::Micro < CompanySize::Global);
    }

    #[test]
    fn test_organization_json_shape() {
        let org = Organization::new("Acme", Industry::Energy, CompanySize::Small);
        let json = serde_json::to_value(&org).unwrap();
        assert_eq!(json["name"], "Acme");
        assert_eq!(json["industry"], "energy");
        assert_eq!(json["size"], "11-50");
        assert!(json.get("website").is_none());
    }
}
