use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};

use crate::core::InputError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Monday through Friday.
pub fn is_working_day(weekday: Weekday) -> bool {
    weekday.num_days_from_monday() < 5
}

/// Count the working days in the inclusive range. Zero if `end` is
/// before `start`.
pub fn count_working_days(start: NaiveDate, end: NaiveDate) -> u32 {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| is_working_day(day.weekday()))
        .count() as u32
}

/// Inclusive `[start, end]` range of calendar days requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InputError> {
        if end < start {
            return Err(InputError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, InputError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Midnight UTC at the beginning of the first day.
    pub fn time_min(&self) -> DateTime<Utc> {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Midnight UTC after the last day, so events on `end` are included.
    pub fn time_max(&self) -> DateTime<Utc> {
        let after = self.end.checked_add_days(Days::new(1)).unwrap_or(self.end);
        after.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    pub fn working_days(&self) -> u32 {
        count_working_days(self.start, self.end)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| InputError::MalformedDate(value.to_string()))
}
