//! Draft validation shared by request handlers

use std::collections::HashSet;
use std::hash::Hash;

/// A rejected input field
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::new(field, "must be a finite number"))
    }
}

pub fn positive(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if finite(field, value)? > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::new(field, "must be greater than zero"))
    }
}

pub fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if finite(field, value)? >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::new(field, "must not be negative"))
    }
}

/// Trimmed, non-empty text
pub fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::new(field, "must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trimmed optional text; blank becomes `None`
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reject repeated keys
pub fn unique<K, I>(field: &'static str, keys: I) -> Result<(), ValidationError>
where
    K: Eq + Hash + std::fmt::Display,
    I: IntoIterator<Item = K>,
{
    let mut seen = HashSet::new();
    for key in keys {
        if seen.contains(&key) {
            return Err(ValidationError::new(field, format!("{} appears more than once", key)));
        }
        seen.insert(key);
    }
    Ok(())
}

/// Loose email shape check; the auth service does the real validation
pub fn email(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = required_text(field, value)?;
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => {
            Ok(value.to_ascii_lowercase())
        }
        _ => Err(ValidationError::new(field, "must be an email address")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_rules() {
        assert!(positive("quantity", 0.5).is_ok());
        assert!(positive("quantity", 0.0).is_err());
        assert!(non_negative("price", 0.0).is_ok());
        assert!(non_negative("price", -0.01).is_err());
        assert_eq!(
            positive("quantity", f64::NAN).unwrap_err().message,
            "must be a finite number"
        );
        assert!(non_negative("price", f64::INFINITY).is_err());
    }

    #[test]
    fn text_rules() {
        assert_eq!(required_text("name", "  Soup ").unwrap(), "Soup");
        assert!(required_text("name", "   ").is_err());
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" cash ")).as_deref(), Some("cash"));
    }

    #[test]
    fn duplicates_are_named() {
        let err = unique("recipe", ["a", "b", "a"]).unwrap_err();
        assert_eq!(err.field, "recipe");
        assert!(err.message.contains("a appears more than once"));
        assert!(unique("recipe", [1, 2, 3]).is_ok());
    }

    #[test]
    fn email_shape() {
        assert_eq!(email("email", " Chef@Bistro.example ").unwrap(), "chef@bistro.example");
        assert!(email("email", "chef").is_err());
        assert!(email("email", "@bistro.example").is_err());
        assert!(email("email", "chef@localhost").is_err());
    }
}
