//! Backend configuration from the environment.

use std::fmt;

use crate::error::AppError;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_ACCESS_TTL_SECS: i64 = 900;
const DEFAULT_REFRESH_TTL_SECS: i64 = 30 * 24 * 3_600;
const DEFAULT_PULL_PAGE_SIZE: i64 = 200;

/// One `email:password` account seeded from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub pull_page_size: usize,
    pub users: Vec<SeedUser>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"[REDACTED]")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .field("pull_page_size", &self.pull_page_size)
            .field("users", &self.users.len())
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let jwt_secret = require_env("CARELOG_API_JWT_SECRET")?;
        let users = parse_users(&require_env("CARELOG_API_USERS")?)?;
        let pull_page_size = parse_env_i64("CARELOG_API_PULL_PAGE_SIZE", DEFAULT_PULL_PAGE_SIZE)?;
        let pull_page_size = usize::try_from(pull_page_size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| {
                AppError::Config("CARELOG_API_PULL_PAGE_SIZE must be positive".to_string())
            })?;

        Ok(Self {
            bind_addr: std::env::var("CARELOG_API_BIND")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret,
            access_ttl_seconds: parse_env_i64("CARELOG_API_ACCESS_TTL_SECS", DEFAULT_ACCESS_TTL_SECS)?,
            refresh_ttl_seconds: parse_env_i64(
                "CARELOG_API_REFRESH_TTL_SECS",
                DEFAULT_REFRESH_TTL_SECS,
            )?,
            pull_page_size,
            users,
        })
    }
}

fn require_env(name: &str) -> Result<String, AppError> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Config(format!("{name} must be set")))
}

fn parse_env_i64(name: &str, default: i64) -> Result<i64, AppError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{name} must be an integer"))),
    }
}

/// Parse `user@example.com:password,other@example.com:password`.
fn parse_users(raw: &str) -> Result<Vec<SeedUser>, AppError> {
    let mut users = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some((email, password)) = entry.split_once(':') else {
            return Err(AppError::Config(format!(
                "CARELOG_API_USERS entry '{entry}' is not email:password"
            )));
        };
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Config(format!(
                "CARELOG_API_USERS entry '{entry}' is not email:password"
            )));
        }
        users.push(SeedUser {
            email: email.trim().to_string(),
            password: password.to_string(),
        });
    }

    if users.is_empty() {
        return Err(AppError::Config(
            "CARELOG_API_USERS must name at least one account".to_string(),
        ));
    }
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_users_splits_entries() {
        let users = parse_users("a@example.com:pw1, b@example.com:pw2").unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].email, "a@example.com");
        assert_eq!(users[1].password, "pw2");
    }

    #[test]
    fn parse_users_rejects_malformed_entries() {
        assert!(parse_users("not-a-pair").is_err());
        assert!(parse_users("").is_err());
        assert!(parse_users(":missing-email").is_err());
    }

    #[test]
    fn config_debug_redacts_secret() {
        let config = AppConfig {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            jwt_secret: "super-secret".to_string(),
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECS,
            pull_page_size: 200,
            users: vec![],
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
