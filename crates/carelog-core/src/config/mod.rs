//! Client configuration for CareLog apps.
//!
//! Endpoints come from the environment (optionally via `.env`); everything
//! here is a safe-to-ship public URL, never a credential.

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};

/// Environment variable naming the API base URL.
pub const API_URL_ENV: &str = "CARELOG_API_URL";
/// Environment variable overriding the local database path.
pub const DB_PATH_ENV: &str = "CARELOG_DB_PATH";

/// Runtime client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the CareLog backend (auth + sync endpoints).
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl ClientConfig {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_base_url: normalize_text_option(std::env::var(API_URL_ENV).ok()),
        }
    }

    /// The API base URL, validated; `Err` explains what is missing or wrong.
    pub fn require_api_base_url(&self) -> Result<String, String> {
        let Some(url) = normalize_text_option(self.api_base_url.clone()) else {
            return Err(format!(
                "Sync is not configured. Set {API_URL_ENV} to the CareLog backend URL."
            ));
        };
        if is_http_url(&url) {
            Ok(url.trim_end_matches('/').to_string())
        } else {
            Err(format!("{API_URL_ENV} must include http:// or https://"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_names_the_env_var() {
        let config = ClientConfig::default();
        let error = config.require_api_base_url().unwrap_err();
        assert!(error.contains(API_URL_ENV));
    }

    #[test]
    fn url_is_validated_and_normalized() {
        let config = ClientConfig {
            api_base_url: Some(" https://api.carelog.dev/ ".to_string()),
        };
        assert_eq!(
            config.require_api_base_url().unwrap(),
            "https://api.carelog.dev"
        );

        let bad = ClientConfig {
            api_base_url: Some("api.carelog.dev".to_string()),
        };
        assert!(bad.require_api_base_url().is_err());
    }
}
