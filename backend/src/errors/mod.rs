//! Global application error types.
//!
//! Every session operation either returns its payload or fails with exactly
//! one [`ServiceError`] kind. Handlers translate the kind into an HTTP status
//! in `api::common`.

use thiserror::Error;

/// Error kinds surfaced by the authentication service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad or missing input.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A unique identity field is already taken.
    #[error("{entity} already exists: {identifier}")]
    Conflict { entity: String, identifier: String },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    /// Credentials or token were not presented or did not match.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Token failed its signature or expiry check.
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// Refresh token verified but is no longer the stored one.
    #[error("Refresh token is expired or already used for user {user_id}")]
    TokenReuse { user_id: String },

    /// A collaborator such as the media host failed.
    #[error("External service error: {message}")]
    Dependency { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    // Helper constructors for common patterns

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::Conflict {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    pub fn token_reuse(user_id: impl Into<String>) -> Self {
        Self::TokenReuse {
            user_id: user_id.into(),
        }
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        Self::Dependency {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Machine-readable identifier used in error responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Conflict { .. } => "conflict",
            Self::NotFound { .. } => "not_found",
            Self::Authentication { .. } => "authentication_error",
            Self::InvalidToken { .. } => "invalid_token",
            Self::TokenReuse { .. } => "token_reuse",
            Self::Dependency { .. } => "dependency_error",
            Self::Internal { .. } => "internal_error",
        }
    }
}

/// Storage failures carry no client-facing meaning and surface as internal errors.
impl From<anyhow::Error> for ServiceError {
    fn from(source: anyhow::Error) -> Self {
        tracing::error!("Storage error: {:#}", source);
        Self::internal_error(source.to_string())
    }
}
