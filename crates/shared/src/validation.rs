//! Common validation utilities.

use validator::ValidationError;

/// Highest weekday index (0 = Sunday, 6 = Saturday).
pub const MAX_WEEKDAY: u8 = 6;

/// Validates a set of weekday indexes.
///
/// Each entry must be in 0..=6 and appear at most once.
pub fn validate_weekdays(days: &[u8]) -> Result<(), ValidationError> {
    if let Some(day) = days.iter().find(|d| **d > MAX_WEEKDAY) {
        let mut err = ValidationError::new("weekday_range");
        err.message = Some(format!("Weekday {} is outside 0-6", day).into());
        return Err(err);
    }

    let mut seen = [false; (MAX_WEEKDAY as usize) + 1];
    for day in days {
        if seen[*day as usize] {
            let mut err = ValidationError::new("weekday_duplicate");
            err.message = Some(format!("Weekday {} is listed more than once", day).into());
            return Err(err);
        }
        seen[*day as usize] = true;
    }

    Ok(())
}

/// Validates that a string is not empty or whitespace only.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}
