//! JWT issuing and verification for the sync endpoint.

use std::collections::HashMap;

use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;

/// Verified caller identity attached to each request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    kind: String,
    iat: i64,
    exp: i64,
}

/// Access/refresh pair handed to clients at login and refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Signs and verifies the HS256 bearer tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl_seconds: config.access_ttl_seconds,
            refresh_ttl_seconds: config.refresh_ttl_seconds,
        }
    }

    pub fn issue_pair(&self, user: &AuthenticatedUser) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue(user, "access", self.access_ttl_seconds)?,
            refresh_token: self.issue(user, "refresh", self.refresh_ttl_seconds)?,
            expires_in: self.access_ttl_seconds,
        })
    }

    fn issue(
        &self,
        user: &AuthenticatedUser,
        kind: &str,
        ttl_seconds: i64,
    ) -> Result<String, AppError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.user_id.clone(),
            email: user.email.clone(),
            kind: kind.to_string(),
            iat: now,
            exp: now + ttl_seconds,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|error| AppError::internal(format!("failed to sign token: {error}")))
    }

    pub fn verify_access(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        self.verify(token, "access")
    }

    pub fn verify_refresh(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        self.verify(token, "refresh")
    }

    fn verify(&self, token: &str, kind: &str) -> Result<AuthenticatedUser, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|error| AppError::unauthorized(format!("invalid token: {error}")))?;

        if data.claims.kind != kind {
            return Err(AppError::unauthorized(format!(
                "expected a {kind} token, got {}",
                data.claims.kind
            )));
        }
        Ok(AuthenticatedUser {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// Account registry seeded from configuration.
pub struct UserRegistry {
    // email -> password; the email doubles as the stable user id
    users: HashMap<String, String>,
}

impl UserRegistry {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            users: config
                .users
                .iter()
                .map(|user| (user.email.clone(), user.password.clone()))
                .collect(),
        }
    }

    pub fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AppError> {
        match self.users.get(email) {
            Some(stored) if stored == password => Ok(AuthenticatedUser {
                user_id: email.to_string(),
                email: email.to_string(),
            }),
            _ => Err(AppError::unauthorized("invalid credentials".to_string())),
        }
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::unauthorized("malformed Authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("expected a bearer token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedUser;

    fn test_config() -> AppConfig {
        AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            jwt_secret: "test-secret".to_string(),
            access_ttl_seconds: 900,
            refresh_ttl_seconds: 3_600,
            pull_page_size: 200,
            users: vec![SeedUser {
                email: "alice@example.com".to_string(),
                password: "correct horse".to_string(),
            }],
        }
    }

    fn alice() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: "alice@example.com".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    #[test]
    fn issued_access_token_verifies() {
        let tokens = TokenService::new(&test_config());
        let pair = tokens.issue_pair(&alice()).unwrap();

        let user = tokens.verify_access(&pair.access_token).unwrap();
        assert_eq!(user.user_id, "alice@example.com");
        assert_eq!(pair.expires_in, 900);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let tokens = TokenService::new(&test_config());
        let pair = tokens.issue_pair(&alice()).unwrap();

        assert!(tokens.verify_access(&pair.refresh_token).is_err());
        assert!(tokens.verify_refresh(&pair.refresh_token).is_ok());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let tokens = TokenService::new(&test_config());
        assert!(tokens.verify_access("not-a-jwt").is_err());
    }

    #[test]
    fn registry_checks_credentials() {
        let registry = UserRegistry::new(&test_config());
        assert!(registry
            .verify_credentials("alice@example.com", "correct horse")
            .is_ok());
        assert!(registry
            .verify_credentials("alice@example.com", "wrong")
            .is_err());
        assert!(registry.verify_credentials("bob@example.com", "pw").is_err());
    }

    #[test]
    fn extract_bearer_token_requires_prefix() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer abc123".parse().unwrap(),
        );
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc123");

        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Basic abc123".parse().unwrap(),
        );
        assert!(extract_bearer_token(&headers).is_err());
    }
}
