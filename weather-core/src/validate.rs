use chrono::{Days, NaiveDate};

/// How far ahead of today a range may end.
pub const MAX_DAYS_AHEAD: u64 = 5;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reason a date range was rejected. Checks run in declaration order and the
/// first failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DateRangeError {
    #[error("Invalid date format")]
    InvalidFormat,
    #[error("Start date must be <= end date")]
    StartAfterEnd,
    #[error("Dates cannot be in the past")]
    PastDate,
    #[error("Max range is 5 days ahead")]
    RangeTooFar,
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, DateRangeError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| DateRangeError::InvalidFormat)
}

/// Validate an optional `start..=end` range against `today`.
///
/// The range is optional: if either bound is missing the check passes.
pub fn validate_date_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<(), DateRangeError> {
    let (Some(start), Some(end)) = (start, end) else {
        return Ok(());
    };

    let start = parse_date(start)?;
    let end = parse_date(end)?;

    if start > end {
        return Err(DateRangeError::StartAfterEnd);
    }
    if start < today {
        return Err(DateRangeError::PastDate);
    }

    let max_end = today
        .checked_add_days(Days::new(MAX_DAYS_AHEAD))
        .unwrap_or(NaiveDate::MAX);
    if end > max_end {
        return Err(DateRangeError::RangeTooFar);
    }

    Ok(())
}
