use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
pub const GOOGLE_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONSENT_TIMEOUT_SECS: u64 = 300;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub token_path: PathBuf,
    pub client_secrets_path: PathBuf,
    pub calendar_id: String,
    pub calendar_api_url: String,
    pub owner_email: Option<String>,
    pub scopes: Vec<String>,
    pub http_timeout: Duration,
    pub consent_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        let token_path = env::var("CALENDAR_ANALYZER_TOKEN_PATH")
            .unwrap_or_else(|_| "token.json".to_string());
        let client_secrets_path = env::var("CALENDAR_ANALYZER_CLIENT_SECRETS_PATH")
            .unwrap_or_else(|_| "credentials.json".to_string());
        let calendar_id =
            env::var("CALENDAR_ANALYZER_CALENDAR_ID").unwrap_or_else(|_| "primary".to_string());
        let calendar_api_url = env::var("CALENDAR_ANALYZER_API_URL")
            .unwrap_or_else(|_| GOOGLE_CALENDAR_API_URL.to_string());
        let owner_email = env::var("CALENDAR_ANALYZER_OWNER_EMAIL")
            .ok()
            .filter(|email| !email.trim().is_empty());
        let http_timeout =
            secs_from_env("CALENDAR_ANALYZER_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS);
        let consent_timeout = secs_from_env(
            "CALENDAR_ANALYZER_CONSENT_TIMEOUT_SECS",
            DEFAULT_CONSENT_TIMEOUT_SECS,
        );

        Self {
            token_path: PathBuf::from(token_path),
            client_secrets_path: PathBuf::from(client_secrets_path),
            calendar_id,
            calendar_api_url,
            owner_email,
            scopes: vec![CALENDAR_READONLY_SCOPE.to_string()],
            http_timeout,
            consent_timeout,
        }
    }
}

impl AppConfig {
    /// Shared HTTP client for the token endpoint and the calendar API.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
    }
}

fn secs_from_env(key: &str, default: u64) -> Duration {
    let secs = match env::var(key) {
        Ok(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}s", key, raw, default);
            default
        }),
        Err(_) => default,
    };
    Duration::from_secs(secs)
}
