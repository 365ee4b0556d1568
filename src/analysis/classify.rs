//! Turn raw calendar events into per-event facts about the owner's
//! response and when the meeting happens.

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use super::window::is_working_day;
use crate::core::DataError;
use crate::google::gcal::{Attendee, RawEvent};

/// Working hours are the clock hours in `[WORKDAY_START_HOUR, WORKDAY_END_HOUR)`.
pub const WORKDAY_START_HOUR: u32 = 9;
pub const WORKDAY_END_HOUR: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseStatus {
    Accepted,
    Declined,
    Tentative,
    NeedsAction,
    NotResponded,
    /// A status string the calendar API sent that isn't one of the above
    Unrecognized(String),
}

impl ResponseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ResponseStatus::Accepted => "accepted",
            ResponseStatus::Declined => "declined",
            ResponseStatus::Tentative => "tentative",
            ResponseStatus::NeedsAction => "needsAction",
            ResponseStatus::NotResponded => "Not Responded",
            ResponseStatus::Unrecognized(s) => s,
        }
    }
}

impl From<&str> for ResponseStatus {
    fn from(value: &str) -> Self {
        match value {
            "accepted" => ResponseStatus::Accepted,
            "declined" => ResponseStatus::Declined,
            "tentative" => ResponseStatus::Tentative,
            "needsAction" => ResponseStatus::NeedsAction,
            "Not Responded" => ResponseStatus::NotResponded,
            other => ResponseStatus::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who counts as the calendar owner when scanning attendees. The API
/// flags the owner's own entry with `self`; an email can be configured
/// as well for calendars where that flag is missing.
#[derive(Debug, Clone, Default)]
pub struct Owner {
    pub email: Option<String>,
}

impl Owner {
    pub fn with_email(email: &str) -> Self {
        Self {
            email: Some(email.to_string()),
        }
    }

    fn is(&self, attendee: &Attendee) -> bool {
        if attendee.is_self {
            return true;
        }
        match (&self.email, &attendee.email) {
            (Some(owner), Some(email)) => owner.eq_ignore_ascii_case(email.trim()),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerResponse {
    Found(ResponseStatus),
    NotFound,
}

impl OwnerResponse {
    pub fn into_status(self) -> ResponseStatus {
        match self {
            OwnerResponse::Found(status) => status,
            OwnerResponse::NotFound => ResponseStatus::NotResponded,
        }
    }
}

pub fn find_owner_response(attendees: &[Attendee], owner: &Owner) -> OwnerResponse {
    match attendees.iter().find(|attendee| owner.is(attendee)) {
        Some(attendee) => OwnerResponse::Found(
            attendee
                .response_status
                .as_deref()
                .map(ResponseStatus::from)
                .unwrap_or(ResponseStatus::NotResponded),
        ),
        None => OwnerResponse::NotFound,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventFact {
    pub date: NaiveDate,
    pub start_time: DateTime<FixedOffset>,
    pub duration_hours: f64,
    pub response_status: ResponseStatus,
    pub during_working_hours: bool,
    /// Derived for completeness, not used by the metrics
    pub during_working_days: bool,
}

pub fn is_working_hour(start: &DateTime<FixedOffset>) -> bool {
    (WORKDAY_START_HOUR..WORKDAY_END_HOUR).contains(&start.hour())
}

fn malformed(event: &RawEvent, reason: impl Into<String>) -> DataError {
    DataError::MalformedEvent {
        id: if event.id.is_empty() {
            "<no id>".to_string()
        } else {
            event.id.clone()
        },
        reason: reason.into(),
    }
}

fn parse_timestamp(
    event: &RawEvent,
    which: &str,
    value: &str,
) -> Result<DateTime<FixedOffset>, DataError> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|e| malformed(event, format!("invalid {} time {:?}: {}", which, value, e)))
}

/// Build the fact for one event. `Ok(None)` for all-day events.
pub fn classify_event(event: &RawEvent, owner: &Owner) -> Result<Option<EventFact>, DataError> {
    if event.start.is_all_day() {
        return Ok(None);
    }
    let Some(start_raw) = event.start.date_time.as_deref() else {
        return Err(malformed(event, "start has neither date nor dateTime"));
    };
    let Some(end_raw) = event.end.date_time.as_deref() else {
        return Err(malformed(event, "timed event has no end dateTime"));
    };

    let start_time = parse_timestamp(event, "start", start_raw)?;
    let end_time = parse_timestamp(event, "end", end_raw)?;
    // Negative durations are passed through as-is
    let duration_hours = (end_time - start_time).num_milliseconds() as f64 / 3_600_000.0;

    let response_status = find_owner_response(&event.attendees, owner).into_status();
    if let ResponseStatus::Unrecognized(status) = &response_status {
        tracing::warn!("Event {} has unrecognized response status {:?}", event.id, status);
    }

    Ok(Some(EventFact {
        date: start_time.date_naive(),
        start_time,
        duration_hours,
        response_status,
        during_working_hours: is_working_hour(&start_time),
        during_working_days: is_working_day(start_time.weekday()),
    }))
}

/// Classify every timed event, keeping the order the API returned them
/// in. All-day events are skipped; any other malformed record is an
/// error rather than being miscounted.
pub fn analyze_calendar_data(
    events: &[RawEvent],
    owner: &Owner,
) -> Result<Vec<EventFact>, DataError> {
    let mut facts = Vec::with_capacity(events.len());
    let mut skipped = 0;
    for event in events {
        match classify_event(event, owner)? {
            Some(fact) => facts.push(fact),
            None => skipped += 1,
        }
    }
    tracing::debug!(
        "Classified {} events, skipped {} all-day events",
        facts.len(),
        skipped
    );
    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::gcal::EventDateTime;

    fn timed(id: &str, start: &str, end: &str, attendees: Vec<Attendee>) -> RawEvent {
        RawEvent {
            id: id.to_string(),
            start: EventDateTime {
                date_time: Some(start.to_string()),
                ..Default::default()
            },
            end: EventDateTime {
                date_time: Some(end.to_string()),
                ..Default::default()
            },
            attendees,
            ..Default::default()
        }
    }

    fn attendee(email: &str, is_self: bool, status: Option<&str>) -> Attendee {
        Attendee {
            email: Some(email.to_string()),
            is_self,
            response_status: status.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_response_status_strings() {
        for s in ["accepted", "declined", "tentative", "needsAction", "Not Responded"] {
            assert_eq!(ResponseStatus::from(s).as_str(), s);
        }
        assert_eq!(
            ResponseStatus::from("maybe"),
            ResponseStatus::Unrecognized("maybe".to_string())
        );
    }

    #[test]
    fn test_find_owner_response_by_self_flag() {
        let attendees = vec![
            attendee("other@example.com", false, Some("declined")),
            attendee("me@example.com", true, Some("accepted")),
        ];
        assert_eq!(
            find_owner_response(&attendees, &Owner::default()),
            OwnerResponse::Found(ResponseStatus::Accepted)
        );
    }

    #[test]
    fn test_find_owner_response_by_email() {
        let attendees = vec![
            attendee("other@example.com", false, Some("declined")),
            attendee("Me@Example.com", false, Some("tentative")),
        ];
        assert_eq!(
            find_owner_response(&attendees, &Owner::with_email("me@example.com")),
            OwnerResponse::Found(ResponseStatus::Tentative)
        );
        assert_eq!(
            find_owner_response(&attendees, &Owner::default()),
            OwnerResponse::NotFound
        );
    }

    #[test]
    fn test_find_owner_response_missing_status() {
        let attendees = vec![attendee("me@example.com", true, None)];
        assert_eq!(
            find_owner_response(&attendees, &Owner::default()).into_status(),
            ResponseStatus::NotResponded
        );
    }

    #[test]
    fn test_classify_event_without_attendees() {
        let event = timed("e1", "2024-03-04T10:00:00Z", "2024-03-04T11:30:00Z", vec![]);
        let fact = classify_event(&event, &Owner::default()).unwrap().unwrap();
        assert_eq!(fact.response_status, ResponseStatus::NotResponded);
        assert_eq!(fact.duration_hours, 1.5);
        assert!(fact.during_working_hours);
        assert!(fact.during_working_days);
        assert_eq!(fact.date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn test_working_hours_use_event_offset() {
        // 08:30 in New York is 13:30 UTC
        let event = timed(
            "e1",
            "2024-03-04T08:30:00-05:00",
            "2024-03-04T09:00:00-05:00",
            vec![],
        );
        let fact = classify_event(&event, &Owner::default()).unwrap().unwrap();
        assert!(!fact.during_working_hours);
        assert_eq!(fact.duration_hours, 0.5);
    }

    #[test]
    fn test_working_hours_boundaries() {
        let cases = [
            ("2024-03-04T08:59:00Z", false),
            ("2024-03-04T09:00:00Z", true),
            ("2024-03-04T17:59:00Z", true),
            ("2024-03-04T18:00:00Z", false),
        ];
        for (start, expected) in cases {
            let event = timed("e", start, "2024-03-04T19:00:00Z", vec![]);
            let fact = classify_event(&event, &Owner::default()).unwrap().unwrap();
            assert_eq!(fact.during_working_hours, expected, "start {}", start);
        }
    }

    #[test]
    fn test_weekend_event() {
        // Saturday
        let event = timed("e1", "2024-03-09T10:00:00Z", "2024-03-09T11:00:00Z", vec![]);
        let fact = classify_event(&event, &Owner::default()).unwrap().unwrap();
        assert!(fact.during_working_hours);
        assert!(!fact.during_working_days);
    }

    #[test]
    fn test_negative_duration_passes_through() {
        let event = timed("e1", "2024-03-04T11:00:00Z", "2024-03-04T10:00:00Z", vec![]);
        let fact = classify_event(&event, &Owner::default()).unwrap().unwrap();
        assert_eq!(fact.duration_hours, -1.0);
    }

    #[test]
    fn test_all_day_events_are_skipped() {
        let all_day = RawEvent {
            id: "holiday".to_string(),
            start: EventDateTime {
                date: Some("2024-03-04".to_string()),
                ..Default::default()
            },
            end: EventDateTime {
                date: Some("2024-03-05".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let meeting = timed("m1", "2024-03-04T10:00:00Z", "2024-03-04T11:00:00Z", vec![]);

        let facts = analyze_calendar_data(&[all_day, meeting], &Owner::default()).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].start_time.to_rfc3339(), "2024-03-04T10:00:00+00:00");
    }

    #[test]
    fn test_malformed_events_are_errors() {
        let no_end = RawEvent {
            id: "e1".to_string(),
            start: EventDateTime {
                date_time: Some("2024-03-04T10:00:00Z".to_string()),
                ..Default::default()
            },
            end: EventDateTime {
                date: Some("2024-03-05".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = analyze_calendar_data(&[no_end], &Owner::default()).unwrap_err();
        assert_eq!(
            err,
            DataError::MalformedEvent {
                id: "e1".to_string(),
                reason: "timed event has no end dateTime".to_string(),
            }
        );

        let bad_time = timed("e2", "tomorrow", "2024-03-04T11:00:00Z", vec![]);
        let err = analyze_calendar_data(&[bad_time], &Owner::default()).unwrap_err();
        assert!(matches!(err, DataError::MalformedEvent { id, .. } if id == "e2"));

        let no_start = RawEvent::default();
        let err = analyze_calendar_data(&[no_start], &Owner::default()).unwrap_err();
        assert!(matches!(err, DataError::MalformedEvent { id, .. } if id == "<no id>"));
    }

    #[test]
    fn test_order_is_preserved() {
        let events = vec![
            timed("late", "2024-03-05T10:00:00Z", "2024-03-05T11:00:00Z", vec![]),
            timed("early", "2024-03-04T10:00:00Z", "2024-03-04T11:00:00Z", vec![]),
        ];
        let facts = analyze_calendar_data(&events, &Owner::default()).unwrap();
        assert_eq!(facts[0].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(facts[1].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }
}
