//! Calendar-date normalization for loan dates.
//!
//! Loan dates are edited as date-only `yyyy-MM-dd` text (a date picker value)
//! but persisted as absolute UTC instants. Parsing a date-only string at
//! midnight shifts it to the previous or next day once the instant is read
//! back in another time zone, so all conversion goes through the helpers
//! here, which anchor the time-of-day at **local noon**. Noon survives any
//! zone offset within ±12h of UTC without crossing a day boundary.
//!
//! The anchor is applied exactly once, when the text is parsed. Rendering
//! ([`to_calendar_date`], [`format_for_display`]) never re-adjusts.

use chrono::{DateTime, Local, LocalResult, NaiveDate, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid calendar date '{0}', expected yyyy-MM-dd")]
    InvalidDateFormat(String),
}

const CALENDAR_FORMAT: &str = "%Y-%m-%d";

/// Parse `yyyy-MM-dd` text into the absolute instant to persist.
///
/// Rejects anything that is not a real calendar date (`2024-02-30`,
/// `not-a-date`). Empty input is the caller's problem: this function treats
/// it as malformed rather than silently substituting today.
pub fn to_stored_timestamp(calendar_date_text: &str) -> Result<DateTime<Utc>, DateError> {
    let date = NaiveDate::parse_from_str(calendar_date_text, CALENDAR_FORMAT)
        .map_err(|_| DateError::InvalidDateFormat(calendar_date_text.to_string()))?;

    let noon = date
        .and_hms_opt(12, 0, 0)
        .expect("noon is a valid time of day");

    let local = match Local.from_local_datetime(&noon) {
        LocalResult::Single(dt) => dt,
        // A DST transition at noon does not occur in zones within ±12h of
        // UTC; if the platform reports one anyway, take the earlier instant.
        LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => return Ok(Utc.from_utc_datetime(&noon)),
    };

    Ok(local.with_timezone(&Utc))
}

/// Render a stored instant back to `yyyy-MM-dd`, the inverse of
/// [`to_stored_timestamp`].
pub fn to_calendar_date(stored: DateTime<Utc>) -> String {
    stored.with_timezone(&Local).format(CALENDAR_FORMAT).to_string()
}

/// Render a stored instant with an arbitrary display pattern
/// (e.g. `%d/%m/%Y`). Pure formatting, no offset adjustment.
pub fn format_for_display(stored: DateTime<Utc>, pattern: &str) -> String {
    stored.with_timezone(&Local).format(pattern).to_string()
}

/// True iff the parsed calendar date is strictly before `reference`.
/// Same-day is not overdue. Empty input means "no date" and is never overdue.
pub fn is_overdue(calendar_date_text: &str, reference: NaiveDate) -> Result<bool, DateError> {
    if calendar_date_text.is_empty() {
        return Ok(false);
    }

    let date = NaiveDate::parse_from_str(calendar_date_text, CALENDAR_FORMAT)
        .map_err(|_| DateError::InvalidDateFormat(calendar_date_text.to_string()))?;

    Ok(date < reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_calendar_dates() {
        for text in ["2024-03-15", "2024-02-29", "2023-12-31", "2024-01-01"] {
            let stored = to_stored_timestamp(text).unwrap();
            assert_eq!(to_calendar_date(stored), text);
        }
    }

    #[test]
    fn display_formatting_never_shifts_the_day() {
        let stored = to_stored_timestamp("2024-03-15").unwrap();
        assert_eq!(format_for_display(stored, "%d/%m/%Y"), "15/03/2024");
    }

    #[test]
    fn rejects_nonexistent_day() {
        assert_eq!(
            to_stored_timestamp("2024-02-30"),
            Err(DateError::InvalidDateFormat("2024-02-30".into()))
        );
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(to_stored_timestamp("not-a-date").is_err());
        assert!(to_stored_timestamp("").is_err());
        assert!(to_stored_timestamp("15/03/2024").is_err());
    }

    #[test]
    fn same_day_is_not_overdue() {
        let reference = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(!is_overdue("2024-01-01", reference).unwrap());
    }

    #[test]
    fn previous_day_is_overdue() {
        let reference = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(is_overdue("2023-12-31", reference).unwrap());
    }

    #[test]
    fn empty_date_is_never_overdue() {
        let reference = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(!is_overdue("", reference).unwrap());
    }

    #[test]
    fn overdue_rejects_malformed_text() {
        let reference = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(is_overdue("yesterday", reference).is_err());
    }
}
