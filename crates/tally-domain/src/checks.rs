//! Field checks shared by every draft and patch

use crate::error::DomainError;
use tally_mutation::ValidationError;

/// Color given to items created without one
pub const DEFAULT_COLOR: &str = "#3b82f6";

/// Title must contain something other than whitespace
///
/// # Errors
/// `MissingField("title")` when blank.
pub fn title(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField("title"))
    } else {
        Ok(())
    }
}

/// Scores and prices are never negative
///
/// # Errors
/// `InvalidField` when `value < 0`.
pub fn non_negative(field: &'static str, value: i32) -> Result<(), ValidationError> {
    if value < 0 {
        Err(ValidationError::invalid(field, format!("must not be negative, got {value}")))
    } else {
        Ok(())
    }
}

/// Accepts `#rgb` and `#rrggbb`, either case
///
/// # Errors
/// `InvalidColor` for anything else.
pub fn parse_color(value: &str) -> Result<String, DomainError> {
    let digits = value
        .strip_prefix('#')
        .filter(|d| matches!(d.len(), 3 | 6) && d.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| DomainError::InvalidColor(value.to_string()))?;
    Ok(format!("#{}", digits.to_ascii_lowercase()))
}

/// Validation wrapper over [`parse_color`]
///
/// # Errors
/// `InvalidField("color")` when the value is not a hex color.
pub fn color(value: &str) -> Result<(), ValidationError> {
    parse_color(value)
        .map(drop)
        .map_err(|err| ValidationError::invalid("color", err.to_string()))
}

/// Run a check on an optional field
///
/// # Errors
/// Whatever `check` returns for a present value.
pub fn optional<T: ?Sized>(
    value: Option<&T>,
    check: impl FnOnce(&T) -> Result<(), ValidationError>,
) -> Result<(), ValidationError> {
    value.map_or(Ok(()), check)
}
