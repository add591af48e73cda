//! Account-type tag.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown account type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid account type: {0} (expected individual, company or nonprofit)")]
pub struct AccountTypeError(pub String);

/// Closed-set classifier used to gate type-specific pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// A person browsing impact data for themselves.
    #[default]
    Individual,
    /// A company reporting or monitoring its own impact.
    Company,
    /// A nonprofit organization.
    Nonprofit,
}

impl AccountType {
    /// Every account type, in display order.
    pub const ALL: [Self; 3] = [Self::Individual, Self::Company, Self::Nonprofit];

    /// The lowercase wire name (`individual`, `company`, `nonprofit`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Company => "company",
            Self::Nonprofit => "nonprofit",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Individual => "Individual",
            Self::Company => "Company",
            Self::Nonprofit => "Nonprofit",
        }
    }

    /// Whether identities of this type represent an organization.
    #[must_use]
    pub const fn is_organization(self) -> bool {
        matches!(self, Self::Company | Self::Nonprofit)
    }

    pub(crate) const fn bit(self) -> u8 {
        match self {
            Self::Individual => 0b001,
            Self::Company => 0b010,
            Self::Nonprofit => 0b100,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = AccountTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" => Ok(Self::Individual),
            "company" => Ok(Self::Company),
            "nonprofit" | "non-profit" => Ok(Self::Nonprofit),
            _ => Err(AccountTypeError(s.to_owned())),
        }
    }
}
