//! OAuth credentials for the Google Calendar API.
//!
//! Tokens are cached as plaintext JSON at `token_path`. Anyone who can
//! read the file can use the refresh token. The file is created
//! owner-only on unix but is not encrypted.
//!
//! When the cache is missing or can't be refreshed the user is sent
//! through the installed-app consent flow: a browser opens Google's
//! consent page and the authorization code comes back to a one-shot
//! listener on the loopback interface.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::browser::open_in_browser;
use crate::core::{AppConfig, AuthError};

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// Treat tokens this close to expiry as already expired
const EXPIRY_SKEW_SECS: i64 = 60;

const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsSection {
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

/// The JSON file downloaded from the Google Cloud console.
#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecretsSection>,
    web: Option<ClientSecretsSection>,
}

impl ClientSecrets {
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        if !path.exists() {
            return Err(AuthError::MissingClientSecrets(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw, path)
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, AuthError> {
        let invalid = |reason: &str| AuthError::InvalidClientSecrets {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let file: ClientSecretsFile =
            serde_json::from_str(raw).map_err(|e| invalid(&e.to_string()))?;
        let section = file
            .installed
            .or(file.web)
            .ok_or_else(|| invalid("expected an \"installed\" or \"web\" section"))?;

        let client_id = section
            .client_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("missing client_id"))?;
        let client_secret = section
            .client_secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("missing client_secret"))?;

        Ok(Self {
            client_id,
            client_secret,
            auth_uri: section
                .auth_uri
                .unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
            token_uri: section
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }
}

/// Everything needed to use and refresh a token without re-reading
/// the client secret file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => false,
        }
    }

    pub fn covers(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|scope| self.scopes.contains(scope))
    }

    fn from_response(
        resp: TokenResponse,
        previous_refresh_token: Option<String>,
        client_id: &str,
        client_secret: &str,
        token_uri: &str,
        requested_scopes: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        let scopes = match &resp.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => requested_scopes.to_vec(),
        };
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token.or(previous_refresh_token),
            expiry: resp.expires_in.map(|secs| now + Duration::seconds(secs)),
            token_uri: token_uri.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scopes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub expiry: Option<DateTime<Utc>>,
}

impl From<StoredToken> for Credentials {
    fn from(token: StoredToken) -> Self {
        Self {
            access_token: token.access_token,
            expiry: token.expiry,
        }
    }
}

pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns `None` when there is no usable cache. A corrupt cache is
    /// treated like a missing one and will be overwritten.
    pub fn load(&self) -> Option<StoredToken> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Could not read token cache {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!("Ignoring corrupt token cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, token: &StoredToken) -> Result<(), AuthError> {
        let body = serde_json::to_string_pretty(token)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // The mode above only applies when the file is created
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(body.as_bytes())?;
        tracing::debug!("Saved credentials to {}", self.path.display());
        Ok(())
    }
}

/// Where a cached token stands before any network call is made.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialState {
    NoCreds,
    ExpiredRefreshable(StoredToken),
    ExpiredNotRefreshable,
    Valid(StoredToken),
}

impl CredentialState {
    pub fn classify(cached: Option<StoredToken>, scopes: &[String], now: DateTime<Utc>) -> Self {
        let Some(token) = cached else {
            return CredentialState::NoCreds;
        };
        // Tokens granted for other scopes need a fresh consent
        if !token.covers(scopes) {
            tracing::info!("Cached token does not cover the requested scopes");
            return CredentialState::NoCreds;
        }
        if !token.is_expired(now) {
            return CredentialState::Valid(token);
        }
        let refreshable = token
            .refresh_token
            .as_deref()
            .is_some_and(|refresh_token| !refresh_token.is_empty());
        if refreshable {
            CredentialState::ExpiredRefreshable(token)
        } else {
            CredentialState::ExpiredNotRefreshable
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

async fn post_token_request(
    client: &Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let res = client.post(token_uri).form(form).send().await?;
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        return Err(AuthError::TokenEndpoint {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(serde_json::from_str(&text)?)
}

/// Exchange a refresh token for a new access token.
pub async fn refresh_access_token(
    client: &Client,
    token: &StoredToken,
) -> Result<StoredToken, AuthError> {
    let refresh_token = token.refresh_token.clone().unwrap_or_default();
    let resp = post_token_request(
        client,
        &token.token_uri,
        &[
            ("client_id", token.client_id.as_str()),
            ("client_secret", token.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ],
    )
    .await?;

    Ok(StoredToken::from_response(
        resp,
        token.refresh_token.clone(),
        &token.client_id,
        &token.client_secret,
        &token.token_uri,
        &token.scopes,
        Utc::now(),
    ))
}

/// Exchange the authorization code from the consent redirect for tokens.
pub async fn exchange_code_for_token(
    client: &Client,
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
    code_verifier: &str,
) -> Result<TokenResponse, AuthError> {
    post_token_request(
        client,
        &secrets.token_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ],
    )
    .await
}

/// A refresh token the user revoked (or that expired) is reported as
/// `invalid_grant` and can only be replaced through consent.
fn is_revoked_grant(err: &AuthError) -> bool {
    matches!(err, AuthError::TokenEndpoint { status: 400, body } if body.contains("invalid_grant"))
}

/// Proof key for code exchange (RFC 7636, S256).
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::thread_rng().r#gen();
        let verifier = URL_SAFE_NO_PAD.encode(bytes);
        Self::from_verifier(verifier)
    }

    fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

pub fn authorization_url(
    secrets: &ClientSecrets,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
    code_challenge: &str,
) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256&access_type=offline&prompt=consent",
        secrets.auth_uri,
        urlencoding::encode(&secrets.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&scopes.join(" ")),
        urlencoding::encode(state),
        urlencoding::encode(code_challenge),
    )
}

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

const CALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization finished</title></head>
<body><p>Authorization finished. You can close this window and return to the terminal.</p></body>
</html>"#;

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

async fn handle_callback(
    State(sender): State<CallbackSender>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if params.code.is_none() && params.error.is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }
    // Only the first redirect is forwarded
    if let Some(tx) = sender.lock().await.take() {
        let _ = tx.send(params);
    }
    Html(CALLBACK_PAGE).into_response()
}

/// Loopback server that receives the OAuth redirect. Shuts down once
/// the first redirect has been handled or when dropped.
pub struct CallbackServer {
    port: u16,
    params_rx: oneshot::Receiver<CallbackParams>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Start serving on an ephemeral loopback port.
    pub async fn start() -> Result<Self, AuthError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        let (params_tx, params_rx) = oneshot::channel();
        let sender: CallbackSender = Arc::new(Mutex::new(Some(params_tx)));
        let app = Router::new()
            .route("/", get(handle_callback))
            .with_state(sender);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                tracing::error!("OAuth callback server error: {}", err);
            }
        });

        Ok(Self {
            port,
            params_rx,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    /// Wait for the OAuth redirect and return the authorization code.
    pub async fn wait_for_code(mut self, expected_state: &str) -> Result<String, AuthError> {
        let params = (&mut self.params_rx)
            .await
            .map_err(|_| AuthError::CallbackServerStopped)?;
        self.shutdown().await;

        if params.state.as_deref() != Some(expected_state) {
            return Err(AuthError::StateMismatch);
        }
        if let Some(error) = params.error {
            return Err(AuthError::ConsentDenied(error));
        }
        params.code.ok_or(AuthError::CallbackServerStopped)
    }

    // Give the browser's response a moment to flush before stopping
    async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                abort.abort();
            }
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Exchange the consent redirect's code and build the token to cache.
pub async fn token_from_code(
    client: &Client,
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
    code_verifier: &str,
    scopes: &[String],
) -> Result<StoredToken, AuthError> {
    let resp = exchange_code_for_token(client, secrets, code, redirect_uri, code_verifier).await?;
    Ok(StoredToken::from_response(
        resp,
        None,
        &secrets.client_id,
        &secrets.client_secret,
        &secrets.token_uri,
        scopes,
        Utc::now(),
    ))
}

async fn run_consent_flow(client: &Client, config: &AppConfig) -> Result<StoredToken, AuthError> {
    let secrets = ClientSecrets::from_file(&config.client_secrets_path)?;

    let server = CallbackServer::start().await?;
    let redirect_uri = server.redirect_uri();
    let state = Uuid::new_v4().simple().to_string();
    let pkce = Pkce::generate();
    let auth_url = authorization_url(
        &secrets,
        &redirect_uri,
        &config.scopes,
        &state,
        &pkce.challenge,
    );

    println!(
        "\nPlease open the following URL in your browser and authorize access:\n\n{}\n",
        auth_url
    );
    open_in_browser(&auth_url).await;

    let code = tokio::time::timeout(config.consent_timeout, server.wait_for_code(&state))
        .await
        .map_err(|_| AuthError::ConsentTimedOut)??;
    tracing::debug!("Received authorization code, exchanging for tokens");

    token_from_code(
        client,
        &secrets,
        &code,
        &redirect_uri,
        &pkce.verifier,
        &config.scopes,
    )
    .await
}

/// Load cached credentials, refreshing or re-authorizing as needed. The
/// cache file is rewritten whenever a new token is obtained.
pub async fn obtain_credentials(
    client: &Client,
    config: &AppConfig,
) -> Result<Credentials, AuthError> {
    let cache = TokenCache::new(&config.token_path);
    let mut state = CredentialState::classify(cache.load(), &config.scopes, Utc::now());

    loop {
        state = match state {
            CredentialState::Valid(token) => return Ok(token.into()),
            CredentialState::ExpiredRefreshable(token) => {
                tracing::info!("Access token expired, refreshing");
                match refresh_access_token(client, &token).await {
                    Ok(refreshed) => {
                        cache.save(&refreshed)?;
                        CredentialState::Valid(refreshed)
                    }
                    Err(err) if is_revoked_grant(&err) => {
                        tracing::warn!("Refresh token was revoked, authorization required");
                        CredentialState::ExpiredNotRefreshable
                    }
                    Err(err) => return Err(err),
                }
            }
            CredentialState::NoCreds | CredentialState::ExpiredNotRefreshable => {
                tracing::info!("No usable credentials, starting browser authorization");
                let token = run_consent_flow(client, config).await?;
                cache.save(&token)?;
                CredentialState::Valid(token)
            }
        };
    }
}
