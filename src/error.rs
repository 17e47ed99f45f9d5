use thiserror::Error;

/// Errors raised by outage store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A single record was refused by the backend
    #[error("record rejected: {0}")]
    Rejected(String),
}

/// Invalid configuration value
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ConfigError {
    pub fn invalid(name: &'static str, value: impl Into<String>, reason: &'static str) -> Self {
        ConfigError::Invalid {
            name,
            value: value.into(),
            reason,
        }
    }
}
