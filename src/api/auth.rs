//! Authentication endpoints.
//!
//! These are the only paths that establish or tear down the session.
//! Token cookies arrive via `Set-Cookie` and are ingested by the gateway
//! transport; this module handles the user-profile side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiClient, ApiError, Envelope};
use crate::session::UserProfile;

/// Registration payload. The backend expects camelCase field names here,
/// unlike everywhere else.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User record as returned by signup and login.
#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<UserResponse> for UserProfile {
    fn from(user: UserResponse) -> Self {
        Self {
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
        }
    }
}

impl ApiClient {
    /// Create an account. A successful signup also logs the user in: the
    /// response carries the token cookies.
    pub async fn signup(&self, request: &SignupRequest) -> Result<UserProfile, ApiError> {
        let envelope: Envelope<UserResponse> = self.post("/auth/signup", request).await?;
        let profile = self.establish_from(envelope)?;
        info!(email = %profile.email, "Account created");
        Ok(profile)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<UserProfile, ApiError> {
        let envelope: Envelope<UserResponse> = self.post("/auth/login", request).await?;
        let profile = self.establish_from(envelope)?;
        info!(email = %profile.email, "Logged in");
        Ok(profile)
    }

    /// End the session. The local session is dropped even if the server
    /// call fails; a dead token on disk helps nobody.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.get::<serde_json::Value>("/auth/logout").await;
        self.session().clear();
        result.map(|_| ())
    }

    fn establish_from(&self, envelope: Envelope<UserResponse>) -> Result<UserProfile, ApiError> {
        let user = envelope.data.ok_or_else(|| {
            ApiError::Transport("Auth response is missing the user record".to_string())
        })?;
        let profile = UserProfile::from(user);
        self.session().establish(profile.clone());
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::SessionStore;
    use httpmock::prelude::*;
    use std::sync::Arc;

    fn client_for(server: &MockServer) -> ApiClient {
        let config = ApiConfig {
            base_url: server.base_url(),
            timeout_secs: 5,
        };
        ApiClient::new(&config, Arc::new(SessionStore::in_memory())).unwrap()
    }

    fn user_body(status_code: u16) -> serde_json::Value {
        serde_json::json!({
            "status": "success",
            "message": "Request Successful",
            "status_code": status_code,
            "data": {
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": "ada@example.com",
                "role": "user",
                "created_at": "2025-01-15T09:30:00Z",
            },
        })
    }

    #[tokio::test]
    async fn test_login_establishes_session() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/login")
                .json_body(serde_json::json!({
                    "email": "ada@example.com",
                    "password": "hunter2hunter2",
                }));
            then.status(200)
                .header("set-cookie", "access_token=a1; Path=/; HttpOnly")
                .header("set-cookie", "refresh_token=r1; Path=/; HttpOnly")
                .json_body(user_body(200));
        });

        let client = client_for(&server);
        let profile = client
            .login(&LoginRequest {
                email: "ada@example.com".to_string(),
                password: "hunter2hunter2".to_string(),
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(profile.first_name, "Ada");

        let session = client.session().session();
        assert!(session.authenticated);
        assert_eq!(
            client.session().cookie_header(),
            Some("access_token=a1; refresh_token=r1".to_string())
        );
    }

    #[tokio::test]
    async fn test_signup_sends_camel_case_fields() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/signup")
                .json_body(serde_json::json!({
                    "firstName": "Ada",
                    "lastName": "Lovelace",
                    "email": "ada@example.com",
                    "password": "hunter2hunter2",
                }));
            then.status(201)
                .header("set-cookie", "access_token=a1; Path=/; HttpOnly")
                .header("set-cookie", "refresh_token=r1; Path=/; HttpOnly")
                .json_body(user_body(201));
        });

        let client = client_for(&server);
        let profile = client
            .signup(&SignupRequest {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                password: "hunter2hunter2".to_string(),
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(profile.email, "ada@example.com");
        assert!(client.session().session().authenticated);
    }

    #[tokio::test]
    async fn test_failed_login_surfaces_validation_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(400).json_body(serde_json::json!({
                "status": "error",
                "message": "Incorrect email or password",
                "status_code": 400,
                "error": "invalid_credentials_error",
            }));
        });

        let client = client_for(&server);
        let err = client
            .login(&LoginRequest {
                email: "ada@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert!(!client.session().session().authenticated);
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_on_server_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/auth/logout");
            then.status(500).json_body(serde_json::json!({
                "status": "error",
                "message": "Internal server error",
                "status_code": 500,
                "error": "internal_error",
            }));
        });

        let client = client_for(&server);
        client.session().ingest_set_cookies(
            ["access_token=a1", "refresh_token=r1"].iter().copied(),
        );

        let result = client.logout().await;
        assert!(result.is_err());
        assert!(client.session().session().credentials.is_empty());
    }
}
