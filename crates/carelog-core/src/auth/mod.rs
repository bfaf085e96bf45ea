//! Shared CareLog auth client logic.

use std::fmt;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{is_http_url, normalize_text_option};

const EXPIRY_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where the signed-in session lives between runs (keyring, file, memory).
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Bearer credential source consumed by the sync transport.
#[allow(async_fn_in_trait)]
pub trait TokenProvider: Send + Sync {
    /// Current access token, refreshed transparently when it is about to
    /// expire.
    async fn access_token(&self) -> AuthResult<String>;

    /// Force a refresh; used once after the server rejects a credential.
    async fn refresh_access_token(&self) -> AuthResult<String>;
}

/// HTTP client for the CareLog auth endpoints, with session persistence.
#[derive(Clone)]
pub struct AuthClient<S: SessionPersistence> {
    base_url: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> AuthClient<S> {
    pub fn new(base_url: impl AsRef<str>, store: S) -> AuthResult<Self> {
        let base_url = normalize_base_url(base_url.as_ref())?;
        Ok(Self {
            base_url,
            client: Client::builder().build()?,
            store,
        })
    }

    /// Load the persisted session, refreshing it when it is close to expiry.
    ///
    /// A refresh failure clears the stored session rather than surfacing an
    /// error; the caller simply sees "not signed in".
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored_session) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored_session.is_expired() {
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let response = self
            .client
            .post(format!("{}/api/v1/auth/login", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let session = parse_session_response(response).await?;
        self.store.save_session(&session)?;
        Ok(session)
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({
            "refreshToken": refresh_token,
        });
        let response = self
            .client
            .post(format!("{}/api/v1/auth/refresh", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let session = parse_session_response(response).await?;
        self.store.save_session(&session)?;
        Ok(session)
    }

    pub async fn sign_out(&self) -> AuthResult<()> {
        if let Some(session) = self.store.load_session()? {
            let response = self
                .client
                .post(format!("{}/api/v1/auth/logout", self.base_url))
                .bearer_auth(&session.access_token)
                .send()
                .await?;

            if !(response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED) {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AuthError::Api(parse_api_error(status, &body)));
            }
        }

        self.store.clear_session()?;
        Ok(())
    }
}

impl<S: SessionPersistence> TokenProvider for AuthClient<S> {
    async fn access_token(&self) -> AuthResult<String> {
        let session = self
            .restore_session()
            .await?
            .ok_or(AuthError::NotSignedIn)?;
        Ok(session.access_token)
    }

    async fn refresh_access_token(&self) -> AuthResult<String> {
        let session = self.store.load_session()?.ok_or(AuthError::NotSignedIn)?;
        let refreshed = self.refresh_session(&session.refresh_token).await?;
        Ok(refreshed.access_token)
    }
}

async fn parse_session_response(response: reqwest::Response) -> AuthResult<AuthSession> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Api(parse_api_error(status, &body)));
    }

    let payload = response.json::<LoginResponse>().await?;
    Ok(payload.into_session())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: LoginUser,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    id: String,
    email: Option<String>,
}

impl LoginResponse {
    fn into_session(self) -> AuthSession {
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: unix_timestamp_now().saturating_add(self.expires_in),
            user: AuthUser {
                id: self.user.id,
                email: self.user.email,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<AuthErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(url: &str) -> AuthResult<String> {
    let url = normalize_text_option(Some(url.to_string())).ok_or(
        AuthError::InvalidConfiguration("API base URL must not be empty"),
    )?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(AuthError::InvalidConfiguration(
            "API base URL must include http:// or https://",
        ))
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::Api("Email is required".to_string()));
    }
    if password.trim().is_empty() {
        return Err(AuthError::Api("Password is required".to_string()));
    }
    Ok(())
}

fn unix_timestamp_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("api.example.com").is_err());
        assert_eq!(
            normalize_base_url("https://api.example.com/").unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let session = AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user: AuthUser {
                id: "user".to_string(),
                email: None,
            },
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn session_expiry_applies_clock_skew() {
        let session = AuthSession {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: unix_timestamp_now() + EXPIRY_SKEW_SECONDS - 1,
            user: AuthUser {
                id: "user".to_string(),
                email: None,
            },
        };
        assert!(session.is_expired());

        let fresh = AuthSession {
            expires_at: unix_timestamp_now() + 3_600,
            ..session
        };
        assert!(!fresh.is_expired());
    }

    #[test]
    fn login_response_computes_absolute_expiry() {
        let response = LoginResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: 3_600,
            user: LoginUser {
                id: "user".to_string(),
                email: Some("user@example.com".to_string()),
            },
        };
        let session = response.into_session();
        assert!(session.expires_at > unix_timestamp_now() + 3_000);
        assert_eq!(session.user.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn parse_api_error_formats_structured_body() {
        let message = parse_api_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error": "invalid credentials"}"#,
        );
        assert_eq!(message, "invalid credentials (401)");
    }
}
