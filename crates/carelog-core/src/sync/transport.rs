//! Remote transport for the sync RPCs
//!
//! Owns the failure semantics of the wire: bounded exponential backoff for
//! transient errors (network failures and 5xx), exactly one credential
//! refresh-and-retry on an authorization failure, and terminal surfacing of
//! everything else.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::{AuthError, TokenProvider};
use crate::util::{compact_text, is_http_url, normalize_text_option};

use super::wire::{ApiEnvelope, ChangeEntry, Confirmation, PullResponse, PushRequest};

/// Attempts for transient failures before the cycle gives up.
const MAX_ATTEMPTS: u32 = 3;
/// First retry delay; doubles with each further attempt.
const BASE_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid transport configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Authorization failed: {0}")]
    Auth(String),
    #[error("Server rejected the request: {message} ({status})")]
    Rejected { status: u16, message: String },
    #[error("Server error: {message} ({status})")]
    Server { status: u16, message: String },
    #[error("Invalid response payload: {0}")]
    InvalidPayload(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// The two sync RPCs the engine depends on.
#[allow(async_fn_in_trait)]
pub trait SyncTransport {
    /// Fetch every server-side change with `timestamp > since` for the
    /// authenticated user, possibly paginated.
    async fn pull_since(&self, since: i64) -> TransportResult<PullResponse>;

    /// Submit local changes; returns one confirmation per accepted change,
    /// in no particular order.
    async fn push_changes(
        &self,
        changes: &[ChangeEntry],
        last_sync_at: i64,
    ) -> TransportResult<Vec<Confirmation>>;
}

/// HTTP implementation against the CareLog sync endpoint.
pub struct HttpSyncTransport<P: TokenProvider> {
    base_url: String,
    client: reqwest::Client,
    tokens: P,
}

impl<P: TokenProvider> HttpSyncTransport<P> {
    pub fn new(base_url: impl Into<String>, tokens: P) -> TransportResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| TransportError::Network(error.to_string()))?;
        Ok(Self {
            base_url,
            client,
            tokens,
        })
    }

    fn sync_url(&self) -> String {
        format!("{}/api/v1/sync", self.base_url)
    }

    /// Send a request with retry/backoff and a single token refresh.
    async fn execute(
        &self,
        build: impl Fn(&str) -> reqwest::RequestBuilder,
    ) -> TransportResult<reqwest::Response> {
        let mut token = self.tokens.access_token().await.map_err(auth_error)?;
        let mut refreshed = false;
        let mut attempt: u32 = 0;

        loop {
            let response = match build(&token).send().await {
                Ok(response) => response,
                Err(error) => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS {
                        return Err(TransportError::Network(error.to_string()));
                    }
                    tracing::debug!(attempt, "sync request failed, retrying: {error}");
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                // One transparent refresh-and-retry, then the error is real.
                refreshed = true;
                tracing::debug!("credential rejected, attempting refresh");
                token = self
                    .tokens
                    .refresh_access_token()
                    .await
                    .map_err(auth_error)?;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let message = parse_error_body(status, &body);

            if status.is_server_error() {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(TransportError::Server {
                        status: status.as_u16(),
                        message,
                    });
                }
                tracing::debug!(attempt, status = status.as_u16(), "server error, retrying");
                tokio::time::sleep(backoff_delay(attempt)).await;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(TransportError::Auth(message));
            }

            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
    }
}

impl<P: TokenProvider> SyncTransport for HttpSyncTransport<P> {
    async fn pull_since(&self, since: i64) -> TransportResult<PullResponse> {
        let url = self.sync_url();
        let response = self
            .execute(|token| {
                self.client
                    .get(&url)
                    .query(&[("since", since)])
                    .bearer_auth(token)
                    .header("Accept", "application/json")
            })
            .await?;

        response
            .json::<PullResponse>()
            .await
            .map_err(|error| TransportError::InvalidPayload(error.to_string()))
    }

    async fn push_changes(
        &self,
        changes: &[ChangeEntry],
        last_sync_at: i64,
    ) -> TransportResult<Vec<Confirmation>> {
        let url = self.sync_url();
        let body = PushRequest {
            changes: changes.to_vec(),
            last_sync_at,
        };
        let response = self
            .execute(|token| self.client.post(&url).bearer_auth(token).json(&body))
            .await?;

        let envelope = response
            .json::<ApiEnvelope<Vec<Confirmation>>>()
            .await
            .map_err(|error| TransportError::InvalidPayload(error.to_string()))?;

        if envelope.code != 0 {
            return Err(TransportError::Rejected {
                status: 200,
                message: envelope.message,
            });
        }
        Ok(envelope.data.unwrap_or_default())
    }
}

fn auth_error(error: AuthError) -> TransportError {
    TransportError::Auth(error.to_string())
}

fn backoff_delay(attempt: u32) -> Duration {
    BASE_BACKOFF * 2_u32.saturating_pow(attempt.saturating_sub(1))
}

fn normalize_base_url(raw: String) -> TransportResult<String> {
    let url = normalize_text_option(Some(raw)).ok_or_else(|| {
        TransportError::InvalidConfiguration("base URL must not be empty".to_string())
    })?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(TransportError::InvalidConfiguration(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_error_body(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        compact_text(trimmed)
    }
}
