//! Validation helpers for DTOs and lobby requests.

use validator::ValidationError;

/// Shortest pin the server hands out or accepts.
pub const MIN_PIN_LENGTH: usize = 4;
/// Longest pin the server hands out or accepts.
pub const MAX_PIN_LENGTH: usize = 8;

/// Validates that a board pin is a short string of ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_pin("4821")  // Ok
/// validate_pin("48a1")  // Err - not numeric
/// validate_pin("482")   // Err - too short
/// ```
pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if !(MIN_PIN_LENGTH..=MAX_PIN_LENGTH).contains(&pin.len()) {
        let mut err = ValidationError::new("pin_length");
        err.message = Some(
            format!(
                "Pin must be between {MIN_PIN_LENGTH} and {MAX_PIN_LENGTH} digits (got {})",
                pin.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !pin.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("pin_format");
        err.message = Some("Pin must contain only digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a display name against the configured naming policy.
///
/// Names must not be blank, must fit in `max_len` characters and must not match a
/// blocked name (compared case-insensitively).
pub fn validate_display_name(
    name: &str,
    max_len: usize,
    blocked: &[String],
) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Display name must not be empty".into());
        return Err(err);
    }

    let length = name.chars().count();
    if length > max_len {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some(
            format!("Display name must be at most {max_len} characters (got {length})").into(),
        );
        return Err(err);
    }

    if blocked
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name.trim()))
    {
        let mut err = ValidationError::new("display_name_blocked");
        err.message = Some("Display name is not allowed".into());
        return Err(err);
    }

    Ok(())
}
