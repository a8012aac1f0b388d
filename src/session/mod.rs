//! Session and credential state.
//!
//! The session is process-wide and owned by the API gateway: only the
//! login, logout, and refresh paths mutate it. Everything else reads a
//! snapshot. The store persists to `session.json` under the data directory
//! so a new CLI invocation can resume an existing session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

const SESSION_FILE: &str = "session.json";

/// Authenticated user profile as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
}

/// Token pair issued at login and rotated by refresh.
///
/// The backend delivers these as `access_token` / `refresh_token` cookies;
/// the store keeps the raw values so rotation is observable and the pair
/// survives process restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// Build the `Cookie` header value attached to every request.
    pub fn cookie_header(&self) -> Option<String> {
        let mut pairs = Vec::new();
        if let Some(access) = &self.access_token {
            pairs.push(format!("access_token={}", access));
        }
        if let Some(refresh) = &self.refresh_token {
            pairs.push(format!("refresh_token={}", refresh));
        }
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

/// Session state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub authenticated: bool,
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub credentials: Credentials,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Parse a `Set-Cookie` header value into its name/value pair.
///
/// Returns `None` for headers that are not a token cookie. An empty value
/// (cookie deletion, as sent by logout) maps to `Some((name, None))`.
fn parse_token_cookie(raw: &str) -> Option<(String, Option<String>)> {
    let pair = raw.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name != "access_token" && name != "refresh_token" {
        return None;
    }
    let value = value.trim();
    if value.is_empty() || value == "\"\"" {
        Some((name.to_string(), None))
    } else {
        Some((name.to_string(), Some(value.to_string())))
    }
}

/// Process-wide session store.
pub struct SessionStore {
    inner: RwLock<Session>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// In-memory store without persistence, used in tests.
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(Session::default()),
            path: None,
        }
    }

    /// Open (or initialize) the persisted store under `data_dir`.
    pub fn open(data_dir: &Path) -> Self {
        let path = data_dir.join(SESSION_FILE);
        let session = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Session>(&content) {
                Ok(session) => {
                    debug!("Resumed session from {}", path.display());
                    session
                }
                Err(e) => {
                    warn!("Ignoring corrupt session file {}: {}", path.display(), e);
                    Session::default()
                }
            },
            Err(_) => Session::default(),
        };
        Self {
            inner: RwLock::new(session),
            path: Some(path),
        }
    }

    /// Current session snapshot.
    pub fn session(&self) -> Session {
        self.inner.read().expect("session lock poisoned").clone()
    }

    /// Cookie header for the current credential pair, if any.
    pub fn cookie_header(&self) -> Option<String> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .credentials
            .cookie_header()
    }

    /// Ingest `Set-Cookie` values from a response, rotating whichever
    /// tokens the backend re-issued. Non-token cookies are ignored.
    pub(crate) fn ingest_set_cookies<'a>(&self, raw_cookies: impl Iterator<Item = &'a str>) {
        let mut rotated = false;
        {
            let mut session = self.inner.write().expect("session lock poisoned");
            for raw in raw_cookies {
                let Some((name, value)) = parse_token_cookie(raw) else {
                    continue;
                };
                match name.as_str() {
                    "access_token" => session.credentials.access_token = value,
                    "refresh_token" => session.credentials.refresh_token = value,
                    _ => unreachable!(),
                }
                rotated = true;
            }
            if rotated {
                session.updated_at = Some(Utc::now());
            }
        }
        if rotated {
            self.persist();
        }
    }

    /// Mark the session authenticated after a confirmed login/signup.
    pub(crate) fn establish(&self, user: UserProfile) {
        {
            let mut session = self.inner.write().expect("session lock poisoned");
            session.authenticated = true;
            session.user = Some(user);
            session.updated_at = Some(Utc::now());
        }
        self.persist();
    }

    /// Drop the session: logout or irrecoverable refresh failure.
    pub(crate) fn clear(&self) {
        {
            let mut session = self.inner.write().expect("session lock poisoned");
            *session = Session::default();
        }
        if let Some(path) = &self.path {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Failed to remove session file {}: {}", path.display(), e);
                }
            }
        }
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let session = self.session();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create data dir {}: {}", parent.display(), e);
                return;
            }
        }
        match serde_json::to_string_pretty(&session) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    warn!("Failed to persist session to {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("Failed to serialize session: {}", e),
        }
    }
}
