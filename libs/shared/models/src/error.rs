use serde::Serialize;
use thiserror::Error;

/// Top-level error shown to the user as a dismissible message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal Error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorNotice {
    pub kind: &'static str,
    pub message: String,
}

impl AppError {
    /// The bare message, without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::Conflict(msg)
            | AppError::ExternalService(msg)
            | AppError::Internal(msg) => msg,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "auth",
            AppError::NotFound(_) => "not_found",
            AppError::ValidationError(_) => "validation",
            AppError::Conflict(_) => "conflict",
            AppError::ExternalService(_) => "external_service",
            AppError::Internal(_) => "internal",
        }
    }

    /// Log the error and turn it into the notice the host displays.
    pub fn into_notice(self) -> ErrorNotice {
        match &self {
            AppError::ValidationError(msg) => tracing::warn!("{}: {}", self.kind(), msg),
            _ => tracing::error!("{}: {}", self.kind(), self.message()),
        }

        ErrorNotice {
            kind: self.kind(),
            message: self.message().to_string(),
        }
    }
}
