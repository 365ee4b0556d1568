pub mod gcal;
pub mod oauth;

pub use gcal::{CalendarSource, GoogleCalendar, RawEvent};
pub use oauth::{Credentials, obtain_credentials};
