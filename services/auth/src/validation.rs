//! Input validation utilities
//!
//! Each rule returns the message shown to the client on failure. Callers
//! trim input first; usernames and emails are lowercased before checking.

use regex::Regex;
use std::sync::OnceLock;

/// Longest accepted video title
pub const TITLE_MAX: usize = 100;
/// Longest accepted video description
pub const DESCRIPTION_MAX: usize = 500;
/// Longest accepted comment
pub const COMMENT_MAX: usize = 500;
/// Longest accepted tweet
pub const TWEET_MAX: usize = 280;
/// Longest accepted playlist description
pub const PLAYLIST_DESCRIPTION_MAX: usize = 200;

/// Require a non-empty value
pub fn validate_required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(())
}

/// Require a non-empty value of at most `max` characters
pub fn validate_text(field: &str, value: &str, max: usize) -> Result<(), String> {
    validate_required(field, value)?;
    if value.chars().count() > max {
        return Err(format!("{} must be at most {} characters long", field, max));
    }
    Ok(())
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username != username.to_lowercase() {
        return Err("Username must be lowercase".to_string());
    }

    if username.len() < 6 {
        return Err("Username must be at least 6 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-z0-9_.]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(
            "Username can only contain lowercase letters, numbers, dots and underscores"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    if !password.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Password can only contain letters and numbers".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("a.b.c.d").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("alice").is_err());
        assert!(validate_username("Alice_01").is_err());
        assert!(validate_username("alice-01").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice@example").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("with space").is_err());
        assert!(validate_password("symbols!!").is_err());
    }

    #[test]
    fn test_text_limits() {
        assert!(validate_text("Content", "hello", TWEET_MAX).is_ok());
        assert!(validate_text("Content", "   ", TWEET_MAX).is_err());
        assert_eq!(
            validate_text("Content", &"x".repeat(281), TWEET_MAX).unwrap_err(),
            "Content must be at most 280 characters long"
        );
        // Limits count characters, not bytes
        assert!(validate_text("Title", &"é".repeat(100), TITLE_MAX).is_ok());
    }
}
