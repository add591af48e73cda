//! Sign-up forms and their validation.
//!
//! Validation collects every field error at once so the form can be
//! re-rendered with all messages in place.

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use open_impact_core::{
    AccountType, CompanySize, Email, Identity, Industry, Organization, normalize_link,
};

use super::password::MIN_PASSWORD_LENGTH;

/// A single invalid form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Form field name.
    pub field: &'static str,
    /// Message shown next to the field.
    pub message: String,
}

/// All field errors of a rejected form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} invalid field(s)", .0.len())]
pub struct RegistrationErrors(Vec<FieldError>);

impl RegistrationErrors {
    /// A single error.
    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Message for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Whether no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The failed fields in form order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

/// A validated sign-up request, ready for the identity provider.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: Email,
    /// Chosen password.
    pub password: SecretString,
    /// Account type the new identity is tagged with.
    pub account_type: AccountType,
    /// Organization for company and nonprofit accounts.
    pub organization: Option<Organization>,
}

impl Registration {
    /// The identity this registration creates.
    #[must_use]
    pub fn to_identity(&self) -> Identity {
        let identity = Identity::new(self.name.clone(), self.email.clone(), self.account_type);
        match &self.organization {
            Some(organization) => identity.with_organization(organization.clone()),
            None => identity,
        }
    }
}

/// Individual sign-up form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndividualSignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub redirect: Option<String>,
}

impl IndividualSignUpForm {
    /// Validate into a [`Registration`].
    ///
    /// # Errors
    ///
    /// Returns every invalid field.
    pub fn validate(&self) -> Result<Registration, RegistrationErrors> {
        let mut errors = RegistrationErrors::default();

        let name = required(&mut errors, "name", &self.name, "Enter your name");
        let email = email(&mut errors, &self.email);
        check_password(&mut errors, &self.password, &self.password_confirm);

        match (name, email) {
            (Some(name), Some(email)) if errors.is_empty() => Ok(Registration {
                name,
                email,
                password: SecretString::from(self.password.clone()),
                account_type: AccountType::Individual,
                organization: None,
            }),
            _ => Err(errors),
        }
    }

    /// Copy for re-rendering, without the passwords.
    #[must_use]
    pub fn without_passwords(&self) -> Self {
        Self {
            password: String::new(),
            password_confirm: String::new(),
            ..self.clone()
        }
    }
}

/// Company / nonprofit sign-up form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrganizationSignUpForm {
    /// `company` or `nonprofit`.
    pub account_type: String,
    pub company_name: String,
    pub industry: String,
    pub company_size: String,
    pub website: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    /// Checkbox: present when ticked.
    pub agree_to_terms: Option<String>,
    pub redirect: Option<String>,
}

impl OrganizationSignUpForm {
    /// Validate into a [`Registration`].
    ///
    /// # Errors
    ///
    /// Returns every invalid field.
    pub fn validate(&self) -> Result<Registration, RegistrationErrors> {
        let mut errors = RegistrationErrors::default();

        let account_type = match self.account_type.parse::<AccountType>() {
            Ok(account_type) if account_type.is_organization() => Some(account_type),
            _ => {
                errors.push("account_type", "Choose company or nonprofit");
                None
            }
        };

        let company_name = required(
            &mut errors,
            "company_name",
            &self.company_name,
            "Enter the organization name",
        );
        let industry = self.industry.parse::<Industry>().ok();
        if industry.is_none() {
            errors.push("industry", "Choose an industry");
        }
        let size = self.company_size.parse::<CompanySize>().ok();
        if size.is_none() {
            errors.push("company_size", "Choose a company size");
        }
        let website = website(&mut errors, &self.website);

        let first_name = required(
            &mut errors,
            "first_name",
            &self.first_name,
            "Enter your first name",
        );
        let last_name = required(
            &mut errors,
            "last_name",
            &self.last_name,
            "Enter your last name",
        );
        let email = email(&mut errors, &self.email);
        check_password(&mut errors, &self.password, &self.password_confirm);

        if self.agree_to_terms.is_none() {
            errors.push("agree_to_terms", "You must accept the terms to continue");
        }

        match (
            account_type,
            company_name,
            industry,
            size,
            first_name,
            last_name,
            email,
        ) {
            (
                Some(account_type),
                Some(company_name),
                Some(industry),
                Some(size),
                Some(first_name),
                Some(last_name),
                Some(email),
            ) if errors.is_empty() => {
                let mut organization = Organization::new(company_name, industry, size);
                organization.website = website;
                organization.contact_title = non_blank(&self.job_title);

                Ok(Registration {
                    name: format!("{first_name} {last_name}"),
                    email,
                    password: SecretString::from(self.password.clone()),
                    account_type,
                    organization: Some(organization),
                })
            }
            _ => Err(errors),
        }
    }

    /// Copy for re-rendering, without the passwords.
    #[must_use]
    pub fn without_passwords(&self) -> Self {
        Self {
            password: String::new(),
            password_confirm: String::new(),
            ..self.clone()
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn required(
    errors: &mut RegistrationErrors,
    field: &'static str,
    value: &str,
    message: &str,
) -> Option<String> {
    let value = non_blank(value);
    if value.is_none() {
        errors.push(field, message);
    }
    value
}

fn email(errors: &mut RegistrationErrors, value: &str) -> Option<Email> {
    match Email::parse(value) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.push("email", "Enter a valid email address");
            None
        }
    }
}

fn check_password(errors: &mut RegistrationErrors, password: &str, confirm: &str) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    } else if password != confirm {
        errors.push("password_confirm", "Passwords do not match");
    }
}

/// Optional website; bare domains get an `https://` scheme.
fn website(errors: &mut RegistrationErrors, value: &str) -> Option<String> {
    let value = non_blank(value)?;
    match normalize_link(&value) {
        Ok(link) => Some(link),
        Err(_) => {
            errors.push("website", "Enter a valid website address");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn individual() -> IndividualSignUpForm {
        IndividualSignUpForm {
            name: "Ada Lovelace".into(),
            email: "Ada@Example.org".into(),
            password: "analytical".into(),
            password_confirm: "analytical".into(),
            redirect: None,
        }
    }

    fn organization() -> OrganizationSignUpForm {
        OrganizationSignUpForm {
            account_type: "company".into(),
            company_name: "Acme Renewables".into(),
            industry: "Energy".into(),
            company_size: "51-200".into(),
            website: "acme.example.org".into(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            job_title: "Head of ESG".into(),
            email: "grace@acme.example.org".into(),
            password: "cobol-1959".into(),
            password_confirm: "cobol-1959".into(),
            agree_to_terms: Some("on".into()),
            redirect: None,
        }
    }

    #[test]
    fn test_individual_valid() {
        let registration = individual().validate().unwrap();
        assert_eq!(registration.account_type, AccountType::Individual);
        assert_eq!(registration.email.as_str(), "ada@example.org");
        assert_eq!(registration.password.expose_secret(), "analytical");
        assert!(registration.organization.is_none());
    }

    #[test]
    fn test_individual_collects_all_errors() {
        let errors = IndividualSignUpForm::default().validate().unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
    }

    #[test]
    fn test_password_mismatch() {
        let form = IndividualSignUpForm {
            password_confirm: "analytica1".into(),
            ..individual()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("password_confirm"), Some("Passwords do not match"));
        assert!(errors.get("password").is_none());
    }

    #[test]
    fn test_organization_valid() {
        let registration = organization().validate().unwrap();
        assert_eq!(registration.account_type, AccountType::Company);
        assert_eq!(registration.name, "Grace Hopper");

        let org = registration.organization.as_ref().unwrap();
        assert_eq!(org.name, "Acme Renewables");
        assert_eq!(org.industry, Industry::Energy);
        assert_eq!(org.size, CompanySize::Medium);
        assert_eq!(org.website.as_deref(), Some("https://acme.example.org"));
        assert_eq!(org.contact_title.as_deref(), Some("Head of ESG"));

        let identity = registration.to_identity();
        assert_eq!(identity.account_type, AccountType::Company);
        assert_eq!(identity.organization.as_ref(), Some(org));
    }

    #[test]
    fn test_nonprofit_is_accepted() {
        let form = OrganizationSignUpForm {
            account_type: "nonprofit".into(),
            ..organization()
        };
        assert_eq!(
            form.validate().unwrap().account_type,
            AccountType::Nonprofit
        );
    }

    #[test]
    fn test_organization_rejects_individual_type_and_unknown_lists() {
        let form = OrganizationSignUpForm {
            account_type: "individual".into(),
            industry: "Mining".into(),
            company_size: "lots".into(),
            agree_to_terms: None,
            ..organization()
        };
        let errors = form.validate().unwrap_err();
        for field in ["account_type", "industry", "company_size", "agree_to_terms"] {
            assert!(errors.get(field).is_some(), "{field} should fail");
        }
        assert!(errors.get("email").is_none());
    }

    #[test]
    fn test_optional_fields_may_be_blank() {
        let form = OrganizationSignUpForm {
            website: "  ".into(),
            job_title: String::new(),
            ..organization()
        };
        let org = form.validate().unwrap().organization.unwrap();
        assert_eq!(org.website, None);
        assert_eq!(org.contact_title, None);
    }

    #[test]
    fn test_invalid_website() {
        let form = OrganizationSignUpForm {
            website: "ftp://files.example.org".into(),
            ..organization()
        };
        assert!(form.validate().unwrap_err().get("website").is_some());
    }

    #[test]
    fn test_without_passwords() {
        let form = organization().without_passwords();
        assert!(form.password.is_empty() && form.password_confirm.is_empty());
        assert_eq!(form.company_name, "Acme Renewables");
    }
}
