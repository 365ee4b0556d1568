//! Error types for each stage of an analysis run.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Bad command line input. Reported to the user, nothing else runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Dates must be in YYYY-MM-DD format")]
    MalformedDate(String),

    #[error("End date must be after start date")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// Valid credentials could not be obtained.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Client secret file not found at {0}")]
    MissingClientSecrets(PathBuf),

    #[error("Client secret file {path} is invalid: {reason}")]
    InvalidClientSecrets { path: PathBuf, reason: String },

    #[error("Authorization was denied: {0}")]
    ConsentDenied(String),

    #[error("Timed out waiting for the browser authorization")]
    ConsentTimedOut,

    #[error("Authorization callback did not match this login attempt")]
    StateMismatch,

    #[error("Authorization callback server stopped before the redirect arrived")]
    CallbackServerStopped,

    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Credential cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential cache could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The calendar API call failed. Not retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Calendar API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Calendar API response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Calendar API returned page token {0:?} twice")]
    RepeatedPageToken(String),
}

/// An event record from the API had an unexpected shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("Malformed event {id}: {reason}")]
    MalformedEvent { id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Chart template is invalid: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("Chart could not be rendered: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Chart data could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Chart file could not be written: {0}")]
    Io(#[from] std::io::Error),
}
