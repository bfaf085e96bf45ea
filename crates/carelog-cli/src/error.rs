use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] carelog_core::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Auth(#[from] carelog_core::auth::AuthError),
    #[error(transparent)]
    Sync(#[from] carelog_core::sync::SyncError),
    #[error(transparent)]
    Transport(#[from] carelog_core::sync::TransportError),
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("{0}")]
    Config(String),
}
