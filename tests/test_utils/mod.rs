//! Test utilities for integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use calendar_analyzer::core::{AppConfig, FetchError};
use calendar_analyzer::google::gcal::{Attendee, CalendarSource, EventDateTime, RawEvent};
use calendar_analyzer::google::oauth::{StoredToken, TokenCache};

/// A timed event with the given attendees.
pub fn timed_event(id: &str, start: &str, end: &str, attendees: Vec<Attendee>) -> RawEvent {
    RawEvent {
        id: id.to_string(),
        summary: Some(format!("Meeting {}", id)),
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

pub fn all_day_event(id: &str, date: &str, next_date: &str) -> RawEvent {
    RawEvent {
        id: id.to_string(),
        start: EventDateTime {
            date: Some(date.to_string()),
            ..Default::default()
        },
        end: EventDateTime {
            date: Some(next_date.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// The calendar owner's attendee entry.
pub fn me(status: &str) -> Attendee {
    Attendee {
        email: Some("me@example.com".to_string()),
        is_self: true,
        response_status: Some(status.to_string()),
        ..Default::default()
    }
}

pub fn colleague(status: &str) -> Attendee {
    Attendee {
        email: Some("colleague@example.com".to_string()),
        is_self: false,
        response_status: Some(status.to_string()),
        ..Default::default()
    }
}

/// In-memory calendar that records the windows it was asked for.
#[derive(Default)]
pub struct FakeCalendar {
    pub events: Vec<RawEvent>,
    pub requests: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl FakeCalendar {
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self {
            events,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CalendarSource for FakeCalendar {
    async fn fetch_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((window_start, window_end));
        Ok(self.events.clone())
    }
}

/// Config rooted in a temporary directory, pointed at `api_url`.
pub fn test_config(dir: &Path, api_url: &str) -> AppConfig {
    AppConfig {
        token_path: dir.join("token.json"),
        client_secrets_path: dir.join("credentials.json"),
        calendar_id: "primary".to_string(),
        calendar_api_url: api_url.to_string(),
        owner_email: None,
        scopes: vec!["https://www.googleapis.com/auth/calendar.readonly".to_string()],
        http_timeout: Duration::from_secs(5),
        consent_timeout: Duration::from_secs(1),
    }
}

/// Write an unexpired token to the config's cache path.
pub fn seed_valid_token(config: &AppConfig) {
    let token = StoredToken {
        access_token: "test_token".to_string(),
        refresh_token: Some("test_refresh".to_string()),
        expiry: Some(Utc::now() + chrono::Duration::hours(1)),
        token_uri: "http://127.0.0.1:1/token".to_string(),
        client_id: "test_client_id".to_string(),
        client_secret: "test_client_secret".to_string(),
        scopes: config.scopes.clone(),
    };
    TokenCache::new(&config.token_path)
        .save(&token)
        .expect("Failed to seed token cache");
}
