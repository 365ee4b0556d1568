//! Google Calendar v3 client for listing the events in a time window.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::FetchError;

// Largest page size the events.list endpoint accepts
const MAX_RESULTS_PER_PAGE: &str = "2500";

/// Event resource, keeping only the fields the analysis reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: String,
    pub summary: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

/// Timed events carry `dateTime`, all-day events carry `date` only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventDateTime {
    #[serde(rename = "dateTime")]
    pub date_time: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "timeZone")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    pub fn is_all_day(&self) -> bool {
        self.date_time.is_none() && self.date.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attendee {
    pub email: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    /// Set on the attendee entry that represents the calendar owner
    #[serde(rename = "self", default)]
    pub is_self: bool,
    #[serde(rename = "responseStatus")]
    pub response_status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListEventsResponse {
    #[serde(default)]
    pub items: Vec<RawEvent>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// Anything that can list the events of one calendar in a time window.
#[async_trait]
pub trait CalendarSource {
    async fn fetch_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>, FetchError>;
}

/// Read-only access to a single Google calendar.
pub struct GoogleCalendar {
    client: Client,
    api_base_url: String,
    calendar_id: String,
    access_token: String,
}

impl GoogleCalendar {
    pub fn new(client: Client, api_base_url: &str, calendar_id: &str, access_token: &str) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            calendar_id: calendar_id.to_string(),
            access_token: access_token.to_string(),
        }
    }

    async fn fetch_page(
        &self,
        time_min: &str,
        time_max: &str,
        page_token: Option<&str>,
    ) -> Result<ListEventsResponse, FetchError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base_url,
            urlencoding::encode(&self.calendar_id)
        );
        let mut query = vec![
            ("timeMin", time_min),
            ("timeMax", time_max),
            ("singleEvents", "true"),
            ("orderBy", "startTime"),
            ("maxResults", MAX_RESULTS_PER_PAGE),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendar {
    /// List every event instance in the window in start time order,
    /// with recurring events expanded.
    async fn fetch_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>, FetchError> {
        let time_min = window_start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = window_end.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .fetch_page(&time_min, &time_max, page_token.as_deref())
                .await?;
            tracing::debug!("Fetched {} events from {}", page.items.len(), self.calendar_id);
            events.extend(page.items);
            match page.next_page_token {
                Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                    return Err(FetchError::RepeatedPageToken(token));
                }
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::info!(
            "Fetched {} events between {} and {}",
            events.len(),
            time_min,
            time_max
        );
        Ok(events)
    }
}
