//! Field validation helpers shared by the domain crates.

use crate::error::{DomainError, DomainResult};

/// Require `value` to be between `min` and `max` characters (inclusive).
pub fn text_len(label: &str, value: &str, min: usize, max: usize) -> DomainResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(DomainError::validation(format!(
            "{label} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

/// Require non-blank text of bounded length.
pub fn required_text(label: &str, value: &str, max: usize) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{label} cannot be empty")));
    }
    text_len(label, value, 1, max)
}

/// Structural email check: `local@domain.tld`, no whitespace.
pub fn email(label: &str, value: &str) -> DomainResult<()> {
    let invalid = || DomainError::validation(format!("{label} must be a valid email"));

    if value.chars().any(char::is_whitespace) || value.len() > 254 {
        return Err(invalid());
    }
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}
