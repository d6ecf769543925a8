use thiserror::Error;

use crate::infra::error::InfraError;

/// Top-level process error for the binary's startup and serve paths.
///
/// Request-scoped failures never reach this type; handlers map service
/// errors to `infra::http::ApiError` instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
