//! Input validation for CLI commands.
//!
//! Everything here runs before a request is built, so obviously bad input
//! fails locally without a network round trip.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating email addresses
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)+$"
    ).unwrap();

    /// Regex for validating category/subcategory identifiers
    static ref TOPIC_ID_REGEX: Regex = Regex::new(
        r"^[a-z0-9]([a-z0-9_-]*[a-z0-9])?$"
    ).unwrap();
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address format".to_string());
    }

    Ok(())
}

/// Validate a password and its confirmation
pub fn validate_password(password: &str, confirmation: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password is too short (min 8 characters)".to_string());
    }

    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }

    if password != confirmation {
        return Err("Passwords do not match".to_string());
    }

    Ok(())
}

/// Validate a first or last name
pub fn validate_name(name: &str, field_name: &str) -> Result<(), String> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if trimmed.len() > 100 {
        return Err(format!("{} is too long (max 100 characters)", field_name));
    }

    Ok(())
}

/// Validate a topic identifier (category or subcategory ID)
pub fn validate_topic_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("Topic ID is required".to_string());
    }

    if id.len() > 63 {
        return Err("Topic ID is too long (max 63 characters)".to_string());
    }

    if !TOPIC_ID_REGEX.is_match(id) {
        return Err(
            "Topic ID must be lowercase alphanumeric with dashes or underscores, starting and ending with alphanumeric".to_string()
        );
    }

    Ok(())
}

/// Validate a topic selection before submission
pub fn validate_selection(ids: &[String]) -> Result<(), String> {
    if ids.is_empty() {
        return Err("Select at least one topic".to_string());
    }

    for id in ids {
        validate_topic_id(id)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.co.uk").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@domain").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("hunter2hunter2", "hunter2hunter2").is_ok());

        assert!(validate_password("", "").is_err());
        assert!(validate_password("short", "short").is_err()); // too short
        assert!(validate_password("hunter2hunter2", "different").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Ada", "First name").is_ok());
        assert!(validate_name("  Ada  ", "First name").is_ok()); // trimmed

        assert!(validate_name("", "First name").is_err());
        assert!(validate_name("   ", "First name").is_err());
        assert_eq!(
            validate_name("", "Last name").unwrap_err(),
            "Last name is required"
        );
    }

    #[test]
    fn test_validate_topic_id() {
        assert!(validate_topic_id("ai-research").is_ok());
        assert!(validate_topic_id("general_user_usecases").is_ok());
        assert!(validate_topic_id("llm").is_ok());

        assert!(validate_topic_id("").is_err());
        assert!(validate_topic_id("-leading").is_err());
        assert!(validate_topic_id("trailing-").is_err());
        assert!(validate_topic_id("Uppercase").is_err());
        assert!(validate_topic_id("spa ce").is_err());
    }

    #[test]
    fn test_validate_selection() {
        assert!(validate_selection(&["llm".to_string()]).is_ok());

        // Empty selections never reach the network
        assert!(validate_selection(&[]).is_err());
        assert!(validate_selection(&["llm".to_string(), "BAD ID".to_string()]).is_err());
    }
}
