/// Input validators for credentials
/// Features:
/// 1. DoS Protection: Input length limits (bcrypt work is only paid on bounded input)
/// 2. Email validation: RFC 5322 simplified format
///
/// No password-strength policy is applied; the password only has to be present.

use regex::Regex;
use lazy_static::lazy_static;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_PASSWORD_LENGTH: usize = 1024;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex is valid");
}

/// Validates an email address and returns it trimmed.
///
/// Stripping surrounding whitespace is the only normalization; the trimmed
/// form is what gets stored and compared. Case is preserved, so emails are
/// compared case-sensitively by the store.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email"));
    }

    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email"));
    }

    Ok(trimmed.to_string())
}

/// Checks that a password is present and bounded. The value is never trimmed.
pub fn is_valid_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH));
    }

    if password.contains('\0') {
        return Err(ValidationError::SuspiciousContent("password"));
    }

    Ok(())
}

fn has_suspicious_email_patterns(email: &str) -> bool {
    // Local part longer than RFC 5321 allows
    if let Some(at_pos) = email.find('@') {
        if at_pos > 64 {
            return true;
        }
    }

    email.matches('@').count() != 1 || email.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("a@x.com").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_email_case_is_preserved() {
        assert_eq!(is_valid_email("  Alice@Example.com ").unwrap(), "Alice@Example.com");
    }

    #[test]
    fn test_surrounding_whitespace_is_stripped() {
        assert_eq!(is_valid_email(" a@x.com\t").unwrap(), "a@x.com");
        assert!(matches!(
            is_valid_email("   "),
            Err(ValidationError::EmptyField("email"))
        ));
    }

    #[test]
    fn test_inner_whitespace_is_rejected() {
        assert!(is_valid_email("a @x.com").is_err());
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            is_valid_email(&too_long),
            Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH))
        );
        assert_eq!(
            is_valid_email("a@b"),
            Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH))
        );
    }

    #[test]
    fn test_long_local_part_is_suspicious() {
        let email = format!("{}@example.com", "a".repeat(65));
        assert_eq!(
            is_valid_email(&email),
            Err(ValidationError::SuspiciousContent("email"))
        );
    }

    #[test]
    fn test_password_only_needs_to_be_present() {
        assert!(is_valid_password("pw1").is_ok());
        assert_eq!(
            is_valid_password(""),
            Err(ValidationError::EmptyField("password"))
        );
    }

    #[test]
    fn test_password_length_limit() {
        let long = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(is_valid_password(&long).is_err());
        assert!(is_valid_password("pass\0word").is_err());
    }
}
