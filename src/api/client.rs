//! REST client for the dashboard backend.

use crate::models::{AuthUser, DashboardSummary, LoginRequest, LoginResponse, Organization};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Errors returned by the backend client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to backend at {0}")]
    Connect(String),

    #[error("not authorized; log in again or provide a valid token")]
    Unauthorized,

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL including the API prefix, e.g. `http://localhost:8080/api/v1`.
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// An authenticated (or anonymous) session, passed explicitly to each call.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<AuthUser>,
}

impl Session {
    /// Session from a pre-issued bearer token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            user: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Thin JSON client over the dashboard REST API.
pub struct ApiClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Exchange credentials for a session via `POST /auth/login`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let url = self.endpoint("auth/login");
        info!("Logging in as {}", email);

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let login: LoginResponse = self.decode(response).await?;
        debug!(
            "Logged in as {} ({:?}), token valid for {}s",
            login.user.email, login.user.role, login.expires_in
        );

        Ok(Session {
            token: Some(login.access_token),
            user: Some(login.user),
        })
    }

    /// `GET /organizations`
    pub async fn fetch_organizations(&self, session: &Session) -> Result<Vec<Organization>, ApiError> {
        self.get_json("organizations", session).await
    }

    /// `GET /dashboard/summary`
    pub async fn fetch_dashboard_summary(
        &self,
        session: &Session,
    ) -> Result<DashboardSummary, ApiError> {
        self.get_json("dashboard/summary", session).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, session: &Session) -> Result<T, ApiError> {
        let url = self.endpoint(path);
        debug!("GET {}", url);

        let mut request = self.http_client.get(&url);
        if let Some(ref token) = session.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        self.decode(response).await
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn classify(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.config.timeout_seconds)
        } else if e.is_connect() {
            ApiError::Connect(self.config.base_url.clone())
        } else {
            ApiError::Request(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(ClientConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joining() {
        let c = client("http://localhost:8080/api/v1/");
        assert_eq!(
            c.endpoint("/organizations"),
            "http://localhost:8080/api/v1/organizations"
        );
        assert_eq!(
            c.endpoint("dashboard/summary"),
            "http://localhost:8080/api/v1/dashboard/summary"
        );
    }

    #[test]
    fn test_session_constructors() {
        let session = Session::with_token("t0k");
        assert_eq!(session.token.as_deref(), Some("t0k"));
        assert!(session.user.is_none());
        assert!(Session::anonymous().token.is_none());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ApiError::Timeout(30).to_string(),
            "request timed out after 30s"
        );
        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_connect_error() {
        // Grab a free port, then release it so nothing is listening there.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let c = client(&format!("http://127.0.0.1:{}/api/v1", port));
        let err = c
            .fetch_organizations(&Session::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Connect(_) | ApiError::Timeout(_) | ApiError::Request(_)
        ));
    }
}
