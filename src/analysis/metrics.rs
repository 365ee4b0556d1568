use chrono::NaiveDate;
use serde::Serialize;

use super::classify::{EventFact, ResponseStatus};
use super::window::count_working_days;

pub const WORKING_HOURS_PER_DAY: f64 = 8.0;

/// The response statuses that get a bucket in the metrics. Events the
/// owner never responded to are not tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrackedStatus {
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "declined")]
    Declined,
    #[serde(rename = "needsAction")]
    NeedsAction,
    #[serde(rename = "tentative")]
    Tentative,
}

impl TrackedStatus {
    pub const ALL: [TrackedStatus; 4] = [
        TrackedStatus::Accepted,
        TrackedStatus::Declined,
        TrackedStatus::NeedsAction,
        TrackedStatus::Tentative,
    ];

    pub fn response_status(&self) -> ResponseStatus {
        match self {
            TrackedStatus::Accepted => ResponseStatus::Accepted,
            TrackedStatus::Declined => ResponseStatus::Declined,
            TrackedStatus::NeedsAction => ResponseStatus::NeedsAction,
            TrackedStatus::Tentative => ResponseStatus::Tentative,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TrackedStatus::Accepted => "Accepted",
            TrackedStatus::Declined => "Declined",
            TrackedStatus::NeedsAction => "Pending",
            TrackedStatus::Tentative => "Tentative",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusMetrics {
    pub total_hours: f64,
    pub percentage_of_working_hours: f64,
    pub working_hours: f64,
    pub non_working_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSet {
    pub total_working_days: u32,
    pub total_working_hours: f64,
    pub accepted: StatusMetrics,
    pub declined: StatusMetrics,
    #[serde(rename = "needsAction")]
    pub needs_action: StatusMetrics,
    pub tentative: StatusMetrics,
}

impl MetricsSet {
    pub fn get(&self, status: TrackedStatus) -> &StatusMetrics {
        match status {
            TrackedStatus::Accepted => &self.accepted,
            TrackedStatus::Declined => &self.declined,
            TrackedStatus::NeedsAction => &self.needs_action,
            TrackedStatus::Tentative => &self.tentative,
        }
    }

    /// Buckets in display order.
    pub fn iter(&self) -> impl Iterator<Item = (TrackedStatus, &StatusMetrics)> {
        TrackedStatus::ALL
            .into_iter()
            .map(move |status| (status, self.get(status)))
    }
}

fn status_metrics(
    facts: &[EventFact],
    status: &ResponseStatus,
    total_working_hours: f64,
) -> StatusMetrics {
    let mut metrics = StatusMetrics::default();
    for fact in facts.iter().filter(|f| &f.response_status == status) {
        metrics.total_hours += fact.duration_hours;
        if fact.during_working_hours {
            metrics.working_hours += fact.duration_hours;
        } else {
            metrics.non_working_hours += fact.duration_hours;
        }
    }
    metrics.percentage_of_working_hours = if total_working_hours > 0.0 {
        metrics.total_hours / total_working_hours * 100.0
    } else {
        0.0
    };
    metrics
}

/// Roll event facts up into per-status totals for the inclusive
/// `[start_date, end_date]` range. Each event counts once with its full
/// duration, even if it spans several days.
pub fn calculate_meeting_metrics(
    facts: &[EventFact],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> MetricsSet {
    let total_working_days = count_working_days(start_date, end_date);
    let total_working_hours = total_working_days as f64 * WORKING_HOURS_PER_DAY;

    let bucket = |status: TrackedStatus| {
        status_metrics(facts, &status.response_status(), total_working_hours)
    };

    MetricsSet {
        total_working_days,
        total_working_hours,
        accepted: bucket(TrackedStatus::Accepted),
        declined: bucket(TrackedStatus::Declined),
        needs_action: bucket(TrackedStatus::NeedsAction),
        tentative: bucket(TrackedStatus::Tentative),
    }
}
