use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller-correctable input; rejected before touching the backend.
    #[error("validation error: {0}")]
    Validation(String),
    /// Backend unreachable, failed, or returned a corrupt record.
    #[error("store error: {0}")]
    Store(String),
    /// Import source could not be opened or read as a workbook.
    #[error("format error: {0}")]
    Format(String),
}

impl ServiceError {
    /// Prefix the message with what was being attempted, keeping the kind.
    pub fn context(self, what: impl std::fmt::Display) -> Self {
        match self {
            Self::Validation(m) => Self::Validation(m),
            Self::Store(m) => Self::Store(format!("{what}: {m}")),
            Self::Format(m) => Self::Format(format!("{what}: {m}")),
        }
    }

    pub fn is_validation(&self) -> bool { matches!(self, Self::Validation(_)) }
}

impl From<models::errors::ModelError> for ServiceError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::Validation(m) => Self::Validation(m),
        }
    }
}

impl From<redis::RedisError> for ServiceError {
    fn from(e: redis::RedisError) -> Self { Self::Store(e.to_string()) }
}
