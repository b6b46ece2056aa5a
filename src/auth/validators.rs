//! Input validation for registration and password changes

use regex::Regex;
use std::sync::OnceLock;

use crate::common::{ApiError, ValidationResult};

/// Matches the minimum the mobile client enforces.
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 128;

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email regex is valid")
    })
}

pub fn validate_email(email: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    let email = email.trim();

    if email.is_empty() {
        result.add_error("email", "must not be empty");
    } else if email.len() > 254 || !email_regex().is_match(email) {
        result.add_error("email", "must be a valid email address");
    }

    result
}

pub fn validate_password(password: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if password.len() < MIN_PASSWORD_LEN {
        result.add_error(
            "password",
            &format!("must be at least {} characters", MIN_PASSWORD_LEN),
        );
    } else if password.len() > MAX_PASSWORD_LEN {
        result.add_error(
            "password",
            &format!("must be at most {} characters", MAX_PASSWORD_LEN),
        );
    }

    result
}

/// Validate a full credential pair, collecting all errors at once
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    let mut result = validate_email(email);
    result.merge(validate_password(password));

    if result.is_valid {
        Ok(())
    } else {
        Err(result.into())
    }
}

pub fn validate_new_password(password: &str) -> Result<(), ApiError> {
    let result = validate_password(password);
    if result.is_valid {
        Ok(())
    } else {
        Err(result.into())
    }
}
