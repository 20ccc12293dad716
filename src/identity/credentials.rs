//! Local checks for registration input, mirroring the account rules the
//! backend enforces so obvious mistakes fail before a network round trip.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{KeygateError, Result};

const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const USERNAME_PATTERN: &str = r"^[A-Za-z0-9_-]+$";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static USERNAME_RE: OnceLock<Regex> = OnceLock::new();

/// Registration fields after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInput {
    pub email: String,
    pub password: String,
    /// Lowercased.
    pub username: String,
}

pub fn validate_registration(
    email: &str,
    password: &str,
    username: &str,
) -> Result<RegistrationInput> {
    let email = email.trim();
    if !pattern(&EMAIL_RE, EMAIL_PATTERN)?.is_match(email) {
        return Err(KeygateError::InvalidArgument(format!(
            "'{email}' is not a valid email address"
        )));
    }
    validate_password(password)?;
    let username = validate_username(username)?;
    Ok(RegistrationInput {
        email: email.to_string(),
        password: password.to_string(),
        username,
    })
}

pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(8..=128).contains(&len) {
        return Err(invalid("Password must be between 8 and 128 characters"));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(invalid("Password must contain at least one uppercase letter"));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(invalid("Password must contain at least one lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid("Password must contain at least one digit"));
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(invalid("Password must contain at least one special character"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<String> {
    let username = username.trim();
    if !(3..=50).contains(&username.chars().count()) {
        return Err(invalid("Username must be between 3 and 50 characters"));
    }
    if !pattern(&USERNAME_RE, USERNAME_PATTERN)?.is_match(username) {
        return Err(invalid(
            "Username can only contain letters, numbers, underscores, and hyphens",
        ));
    }
    Ok(username.to_lowercase())
}

fn invalid(message: &str) -> KeygateError {
    KeygateError::InvalidArgument(message.to_string())
}

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> Result<&'static Regex> {
    if let Some(re) = cell.get() {
        return Ok(re);
    }
    let re = Regex::new(source)
        .map_err(|err| KeygateError::Configuration(format!("invalid pattern {source}: {err}")))?;
    Ok(cell.get_or_init(|| re))
}
