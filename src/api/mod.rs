//! API gateway client.
//!
//! Single chokepoint for every backend call: attaches the session
//! credential, decodes the uniform response envelope, and owns the
//! reauthentication protocol. When a request comes back 401 the client
//! refreshes the credential exactly once and retries; concurrent 401s
//! wait for that same refresh instead of issuing their own.

pub mod auth;
pub mod error;
pub mod news;

pub use error::{ApiError, ErrorDetail, ErrorEnvelope};

use reqwest::header;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::session::SessionStore;

const REFRESH_PATH: &str = "/auth/refresh";

/// The success envelope every endpoint responds with.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub status: String,
    pub message: String,
    pub status_code: u16,
    #[serde(default)]
    pub data: Option<T>,
}

type RefreshOutcome = Result<(), ApiError>;

/// Refresh coordination state. `None` means idle; `Some` means a refresh
/// is in flight and holds the senders of every parked request, in arrival
/// order.
type RefreshQueue = Option<Vec<oneshot::Sender<RefreshOutcome>>>;

/// HTTP client for the news backend.
///
/// Constructed once per process and shared. The session store is mutated
/// only from here (login/logout/refresh); see [`crate::session`].
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
    refresh: Mutex<RefreshQueue>,
}

impl ApiClient {
    /// Build a client from configuration. The timeout applies to every
    /// request, including the refresh call.
    pub fn new(config: &ApiConfig, session: Arc<SessionStore>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            refresh: Mutex::new(None),
        })
    }

    /// The session store backing this client, for read-only consumers.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ApiError> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ApiError> {
        self.request(Method::DELETE, path, None::<&()>).await
    }

    /// Issue a request with the 401-refresh-retry protocol.
    ///
    /// A request gets at most one retry, and only after a successful
    /// credential refresh; a second 401 propagates to the caller.
    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        match self.execute(method.clone(), path, body).await {
            Err(err) if err.is_authentication() && path != REFRESH_PATH => {
                debug!(path, "Request rejected with 401, entering refresh flow");
                self.reauthorize().await?;
                self.execute(method, path, body).await
            }
            result => result,
        }
    }

    /// Single HTTP round trip: credential attachment, cookie rotation
    /// ingestion, envelope decoding, error normalization. No retries.
    async fn execute<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);
        if let Some(cookie) = self.session.cookie_header() {
            request = request.header(header::COOKIE, cookie);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        // The backend rotates tokens via Set-Cookie on login and refresh
        let raw_cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok().map(str::to_string))
            .collect();
        self.session
            .ingest_set_cookies(raw_cookies.iter().map(String::as_str));

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(ApiError::from_response(status, &bytes));
        }

        serde_json::from_slice::<Envelope<T>>(&bytes)
            .map_err(|e| ApiError::Transport(format!("Failed to parse response body: {}", e)))
    }

    /// Coordinate credential refresh across concurrent 401s.
    ///
    /// The first caller becomes the leader and issues the single refresh
    /// call; everyone else parks a oneshot receiver and gets the shared
    /// outcome, released in arrival (FIFO) order. Nobody is left pending:
    /// the leader always drains the queue, and a dropped sender surfaces
    /// as a session-expired error. The queue is unbounded but holds at
    /// most one entry per in-flight request.
    ///
    /// Any refresh failure is terminal for the session: the store is
    /// cleared and every parked request fails with an authentication
    /// error, which routes the caller back to login.
    async fn reauthorize(&self) -> Result<(), ApiError> {
        let parked = {
            let mut state = self.refresh.lock().expect("refresh lock poisoned");
            match state.as_mut() {
                Some(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                None => {
                    *state = Some(Vec::new());
                    None
                }
            }
        };

        if let Some(rx) = parked {
            return match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(ApiError::session_expired()),
            };
        }

        let outcome = match self
            .execute::<serde_json::Value, ()>(Method::GET, REFRESH_PATH, None)
            .await
        {
            Ok(_) => {
                debug!("Credential refresh succeeded");
                Ok(())
            }
            Err(err) => {
                warn!("Credential refresh failed, dropping session: {}", err);
                self.session.clear();
                Err(ApiError::session_expired())
            }
        };

        let waiters = self
            .refresh
            .lock()
            .expect("refresh lock poisoned")
            .take()
            .unwrap_or_default();
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }

        outcome
    }
}
