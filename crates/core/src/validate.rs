//! Input validation for user-submitted records.
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Trim a required field, rejecting blank values.
pub fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional field; blank becomes `None`.
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Required email, trimmed and lower-cased.
pub fn email(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let email = required(field, value)?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::Invalid {
            field,
            reason: "not an email address".into(),
        }),
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn date(field: &'static str, value: &str) -> Result<chrono::NaiveDate, ValidationError> {
    chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::Invalid {
            field,
            reason: "expected YYYY-MM-DD".into(),
        }
    })
}
