pub mod classify;
pub mod metrics;
pub mod window;

pub use classify::{
    EventFact, Owner, OwnerResponse, ResponseStatus, analyze_calendar_data, find_owner_response,
};
pub use metrics::{MetricsSet, StatusMetrics, TrackedStatus, calculate_meeting_metrics};
pub use window::{DateWindow, count_working_days};
