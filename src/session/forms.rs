//! Local validation of the login and registration forms.
//!
//! Inputs are checked before any request leaves the process; the messages
//! double as the text shown under the form.

use std::collections::BTreeMap;

use records::{LoginCredentials, RegisterRequest, Role, UserStatus};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Enter a valid email address")]
    InvalidEmail,
    #[error("Password is required")]
    MissingPassword,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("Full name is required")]
    MissingFullName,
}

/// Validate login input, trimming the email.
///
/// The password keeps caller-provided whitespace.
///
/// # Errors
///
/// Returns the first failing field check.
pub fn login_credentials(email: &str, password: &str, remember_me: bool) -> Result<LoginCredentials, FormError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FormError::MissingEmail);
    }
    if password.is_empty() {
        return Err(FormError::MissingPassword);
    }
    Ok(LoginCredentials { remember_me, ..LoginCredentials::new(email, password) })
}

/// Registration form as typed by the user.
#[derive(Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Option<Role>,
    pub survey_answers: BTreeMap<String, String>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl Registration {
    /// Validate the form and build the wire request.
    ///
    /// The requested status is pending for every role except admin. A form
    /// without a role registers a student.
    ///
    /// # Errors
    ///
    /// Returns the first failing field check.
    pub fn into_request(self) -> Result<RegisterRequest, FormError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(FormError::MissingEmail);
        }
        if !looks_like_email(email) {
            return Err(FormError::InvalidEmail);
        }
        if self.password.is_empty() {
            return Err(FormError::MissingPassword);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError::PasswordTooShort { min: MIN_PASSWORD_LEN });
        }
        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            return Err(FormError::MissingFullName);
        }

        let role = self.role.unwrap_or(Role::Student);
        Ok(RegisterRequest {
            email: email.to_owned(),
            password: self.password,
            full_name: full_name.to_owned(),
            role,
            status: UserStatus::initial_for(role),
            survey_answers: self.survey_answers,
        })
    }
}

/// One `@` with a non-empty local part and a dotted domain.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

#[cfg(test)]
#[path = "forms_test.rs"]
mod tests;
