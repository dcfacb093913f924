//! Input validation for MFA codes and profile names.

use crate::{Result, RooError};

/// Minimum length of an MFA one-time code.
pub const MIN_MFA_CODE_LENGTH: usize = 6;

/// Characters that have no business in an AWS CLI profile name.
const DANGEROUS_CHARS: &str = ";|&$`<>(){}[]!*?~#%^\\\"' ";

/// Maximum allowed length for profile names.
const MAX_NAME_LENGTH: usize = 255;

/// Validates an MFA one-time code.
///
/// A code must be at least six characters long and consist only of ASCII
/// digits.
///
/// # Errors
///
/// Returns [`RooError::InvalidMfaCode`] if validation fails.
///
/// # Example
///
/// ```
/// use roo::validation::validate_mfa_code;
///
/// assert!(validate_mfa_code("054389").is_ok());
/// assert!(validate_mfa_code("42069").is_err());
/// assert!(validate_mfa_code("hunter2").is_err());
/// ```
pub fn validate_mfa_code(code: &str) -> Result<()> {
    if code.len() < MIN_MFA_CODE_LENGTH {
        return Err(RooError::InvalidMfaCode(format!(
            "code must be at least {} characters long",
            MIN_MFA_CODE_LENGTH
        )));
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(RooError::InvalidMfaCode(
            "code must contain only digits".to_string(),
        ));
    }

    Ok(())
}

/// Strips the line ending a terminal leaves on typed input (`\n`, `\r\n`).
pub fn trim_line_ending(input: &str) -> &str {
    input.trim_end_matches(['\r', '\n'])
}

/// Validates an AWS CLI profile name before handing it to `aws configure`.
///
/// # Errors
///
/// Returns [`RooError::Other`] describing the problem if validation fails.
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid_profile("name cannot be empty"));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(invalid_profile(format!(
            "name exceeds maximum length of {} characters",
            MAX_NAME_LENGTH
        )));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(invalid_profile("name contains control characters"));
    }

    if name.chars().any(|c| DANGEROUS_CHARS.contains(c)) {
        return Err(invalid_profile(format!(
            "name contains invalid characters (not allowed: {})",
            DANGEROUS_CHARS
        )));
    }

    Ok(())
}

fn invalid_profile(reason: impl std::fmt::Display) -> RooError {
    RooError::Other(anyhow::anyhow!("invalid profile name: {}", reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_mfa_codes() {
        assert!(validate_mfa_code("054389").is_ok());
        assert!(validate_mfa_code("12345678").is_ok());
    }

    #[test]
    fn test_empty_mfa_code() {
        let result = validate_mfa_code("");
        assert!(matches!(result, Err(RooError::InvalidMfaCode(_))));
    }

    #[test]
    fn test_short_mfa_code() {
        let result = validate_mfa_code("42069");
        assert!(result.unwrap_err().to_string().contains("at least 6"));
    }

    #[test]
    fn test_non_numeric_mfa_code() {
        for code in ["hunter2", "12345a", "123 456", "-12345", "１２３４５６"] {
            assert!(validate_mfa_code(code).is_err(), "Expected '{}' to fail", code);
        }
    }

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending("123456\r\n"), "123456");
        assert_eq!(trim_line_ending("123456\n"), "123456");
        assert_eq!(trim_line_ending("123456"), "123456");
    }

    #[test]
    fn test_valid_profile_names() {
        assert!(validate_profile_name("default").is_ok());
        assert!(validate_profile_name("prod-admin").is_ok());
        assert!(validate_profile_name("team.prod_readonly").is_ok());
    }

    #[test]
    fn test_invalid_profile_names() {
        let invalid = vec!["", "name; rm -rf /", "name$(whoami)", "two words", "tab\there"];

        for name in invalid {
            assert!(
                validate_profile_name(name).is_err(),
                "Expected '{}' to fail validation",
                name
            );
        }

        assert!(validate_profile_name(&"a".repeat(256)).is_err());
    }
}
