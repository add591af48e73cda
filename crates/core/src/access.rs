//! Account-type gate.

use crate::identity::Identity;
use crate::types::AccountType;

/// A set of acceptable account types.
///
/// Built from a single tag or several:
///
/// ```
/// use open_impact_core::{AccountType, RequiredTypes};
///
/// let company_only = RequiredTypes::only(AccountType::Company);
/// let people = RequiredTypes::from([AccountType::Individual, AccountType::Nonprofit]);
///
/// assert!(company_only.contains(AccountType::Company));
/// assert!(!people.contains(AccountType::Company));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RequiredTypes(u8);

impl RequiredTypes {
    /// The empty set. No identity satisfies it.
    pub const NONE: Self = Self(0);

    /// A set holding one account type.
    #[must_use]
    pub const fn only(account_type: AccountType) -> Self {
        Self(account_type.bit())
    }

    /// This set plus `account_type`.
    #[must_use]
    pub const fn with(self, account_type: AccountType) -> Self {
        Self(self.0 | account_type.bit())
    }

    /// Whether `account_type` is acceptable.
    #[must_use]
    pub const fn contains(self, account_type: AccountType) -> bool {
        self.0 & account_type.bit() != 0
    }

    /// Whether no type is acceptable.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The acceptable types, in [`AccountType::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = AccountType> {
        AccountType::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

impl From<AccountType> for RequiredTypes {
    fn from(account_type: AccountType) -> Self {
        Self::only(account_type)
    }
}

impl<const N: usize> From<[AccountType; N]> for RequiredTypes {
    fn from(types: [AccountType; N]) -> Self {
        types.into_iter().collect()
    }
}

impl FromIterator<AccountType> for RequiredTypes {
    fn from_iter<I: IntoIterator<Item = AccountType>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

/// Whether `identity` may see a page restricted to `required`.
///
/// `None` identity never has access. `None` requirement means any
/// authenticated identity.
#[must_use]
pub fn has_access(identity: Option<&Identity>, required: Option<RequiredTypes>) -> bool {
    match (identity, required) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(identity), Some(required)) => required.contains(identity.account_type),
    }
}
