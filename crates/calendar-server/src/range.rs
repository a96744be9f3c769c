//! Wire date parsing and the width of day/week/month lookups.

use calendar_core::EventDate;
use chrono::{Duration, NaiveDate, NaiveTime};

use crate::error::ApiError;

/// Wire format for dates, e.g. `2024-01-10`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` string into midnight UTC of that day.
pub fn parse_day(raw: &str) -> Result<EventDate, ApiError> {
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| ApiError::InvalidDate(format!("{raw:?}: {e}")))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

/// How far past the start date a lookup reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeWidth {
    Day,
    Week,
    Month,
}

impl RangeWidth {
    pub fn days(self) -> i64 {
        match self {
            Self::Day => 0,
            Self::Week => 7,
            Self::Month => 30,
        }
    }

    /// Inclusive `(start, end)` bounds beginning at `start`.
    pub fn bounds(self, start: EventDate) -> Result<(EventDate, EventDate), ApiError> {
        let end = start
            .checked_add_signed(Duration::days(self.days()))
            .ok_or_else(|| ApiError::InvalidDate("date out of range".into()))?;
        Ok((start, end))
    }
}
