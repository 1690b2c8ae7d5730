//! Structural validation of users
//!
//! All violated rules are accumulated into a single
//! [`NetworkError::Validation`] so a caller sees the complete list of
//! problems in one pass instead of fixing them one at a time.

use std::sync::LazyLock;

use regex::Regex;

use super::user::User;
use crate::errors::{NetworkError, Result};
use crate::types::FIELD_SEPARATOR;

/// Minimum password length, counted after trimming
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+@.+\..+$").expect("static email pattern is valid"));

/// Validator for user registrations and stored user records
#[derive(Debug, Clone, Copy, Default)]
pub struct UserValidator;

impl UserValidator {
    /// Create a validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a registration (or profile update) in one pass.
    ///
    /// Checks the username, email and plaintext password rules together and
    /// reports every violation.
    pub fn validate_registration(&self, username: &str, password: &str, email: &str) -> Result<()> {
        let mut messages = Vec::new();
        check_username(username, &mut messages);
        check_email(email, &mut messages);
        check_password(password, &mut messages);
        if messages.is_empty() {
            Ok(())
        } else {
            Err(NetworkError::Validation { messages })
        }
    }

    /// Validate the structural rules checkable on a stored user (username
    /// and email). Storage backends run this on load; a failure there means
    /// the persisted record is corrupted.
    pub fn validate(&self, user: &User) -> Result<()> {
        let mut messages = Vec::new();
        check_username(user.username(), &mut messages);
        check_email(user.email(), &mut messages);
        if messages.is_empty() {
            Ok(())
        } else {
            Err(NetworkError::Validation { messages })
        }
    }

    /// Validate the password rule alone
    pub fn validate_password(&self, password: &str) -> Result<()> {
        let mut messages = Vec::new();
        check_password(password, &mut messages);
        if messages.is_empty() {
            Ok(())
        } else {
            Err(NetworkError::Validation { messages })
        }
    }
}

fn check_username(username: &str, messages: &mut Vec<String>) {
    if username.trim().is_empty() {
        messages.push("username must not be empty".into());
    } else if username.contains(FIELD_SEPARATOR) {
        messages.push(format!("username must not contain '{FIELD_SEPARATOR}'"));
    }
}

fn check_email(email: &str, messages: &mut Vec<String>) {
    if email.trim().is_empty() {
        messages.push("email must not be empty".into());
    } else if email.contains(FIELD_SEPARATOR) {
        messages.push(format!("email must not contain '{FIELD_SEPARATOR}'"));
    } else if !EMAIL_PATTERN.is_match(email) {
        messages.push("email is not a valid address".into());
    }
}

fn check_password(password: &str, messages: &mut Vec<String>) {
    let trimmed = password.trim();
    if trimmed.is_empty() {
        messages.push("password must not be empty".into());
    } else if trimmed.len() < MIN_PASSWORD_LEN {
        messages.push(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    } else if password.contains(FIELD_SEPARATOR) {
        messages.push(format!("password must not contain '{FIELD_SEPARATOR}'"));
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Credential, Salt};

    fn messages(result: Result<()>) -> Vec<String> {
        match result {
            Err(NetworkError::Validation { messages }) => messages,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        let validator = UserValidator::new();
        assert!(validator
            .validate_registration("ana", "longenough", "ana@mail.com")
            .is_ok());
    }

    #[test]
    fn test_all_violations_are_accumulated() {
        let validator = UserValidator::new();
        let msgs = messages(validator.validate_registration("", "short", "not-an-email"));
        assert_eq!(msgs.len(), 3);
    }

    #[test]
    fn test_password_length_boundary() {
        let validator = UserValidator::new();
        assert!(validator.validate_password("1234567").is_err());
        assert!(validator.validate_password("12345678").is_ok());
    }

    #[test]
    fn test_password_trimmed_before_length_check() {
        let validator = UserValidator::new();
        assert!(validator.validate_password("  1234567  ").is_err());
    }

    #[test]
    fn test_separator_is_rejected_everywhere() {
        let validator = UserValidator::new();
        let msgs = messages(validator.validate_registration("a,na", "pass,word11", "a,na@mail.com"));
        assert_eq!(msgs.len(), 3);
    }

    #[test]
    fn test_email_shape() {
        let validator = UserValidator::new();
        assert!(validator
            .validate_registration("ana", "longenough", "ana@mail")
            .is_err());
        assert!(validator
            .validate_registration("ana", "longenough", "@mail.com")
            .is_err());
        assert!(validator
            .validate_registration("ana", "longenough", "a@b.c")
            .is_ok());
    }

    #[test]
    fn test_stored_user_validation_skips_password() {
        let validator = UserValidator::new();
        let salt = Salt::new([0u8; 8]);
        let user = User::new("ana", Credential::derive("x", &salt), salt, "ana@mail.com");
        // The credential is opaque here; only username/email rules apply.
        assert!(validator.validate(&user).is_ok());

        let bad = User::new("", Credential::derive("x", &salt), salt, "ana@mail.com");
        assert!(validator.validate(&bad).is_err());
    }
}
