use chrono::NaiveDate;
use regex::Regex;

use crate::error::JournalError;
use crate::range::DateRange;

pub const MAX_USER_ID_LENGTH: usize = 128;
pub const MIN_TAX_YEAR: i32 = 1970;
pub const MAX_TAX_YEAR: i32 = 9999;

/// Validate a YYYY-MM-DD date string.
pub fn validate_date(input: &str) -> Result<NaiveDate, JournalError> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
        JournalError::InvalidInput(format!(
            "invalid date '{}'. Expected format: YYYY-MM-DD (e.g., 2025-01-31)",
            trimmed
        ))
    })
}

/// Validate a tax year: must be 1970..=9999.
pub fn validate_year(year: i32) -> Result<i32, JournalError> {
    if !(MIN_TAX_YEAR..=MAX_TAX_YEAR).contains(&year) {
        return Err(JournalError::InvalidInput(format!(
            "year must be between {} and {}, got {}",
            MIN_TAX_YEAR, MAX_TAX_YEAR, year
        )));
    }
    Ok(year)
}

/// Validate a user id: letters, digits, `-` and `_`, at most 128 bytes.
pub fn validate_user_id(input: &str) -> Result<String, JournalError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(JournalError::InvalidInput("user id is empty".to_string()));
    }
    if trimmed.len() > MAX_USER_ID_LENGTH {
        return Err(JournalError::InvalidInput(format!(
            "user id exceeds maximum length of {} bytes",
            MAX_USER_ID_LENGTH
        )));
    }
    let re = Regex::new(r"^[A-Za-z0-9_-]+$")
        .map_err(|e| JournalError::InvalidInput(format!("user id pattern: {}", e)))?;
    if !re.is_match(trimmed) {
        return Err(JournalError::InvalidInput(format!(
            "invalid user id '{}'. Use letters, digits, '-' or '_'",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

/// Build a range from optional bounds.
///
/// A single bound becomes a one-day range. An inverted pair returns `Ok(None)`
/// with a warning, leaving the trade set unfiltered.
pub fn validate_date_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<DateRange>, JournalError> {
    let from = from.map(validate_date).transpose()?;
    let to = to.map(validate_date).transpose()?;
    let range = match (from, to) {
        (None, None) => return Ok(None),
        (Some(day), None) | (None, Some(day)) => DateRange::day(day),
        (Some(from), Some(to)) => DateRange::new(from, to),
    };
    if !range.is_valid() {
        tracing::warn!(
            "Start date {} is after end date {}; showing all trades",
            range.from,
            range.to
        );
        return Ok(None);
    }
    Ok(Some(range))
}
