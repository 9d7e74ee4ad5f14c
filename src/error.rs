use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// The main error type for API operations.
///
/// Every variant maps to a fixed HTTP status and a JSON error envelope.
/// Unexpected failures (`Internal`, `Database`, `Anyhow`) are logged
/// server-side and surface to the client as a generic message only.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<String>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn validation_details(message: impl Into<String>, details: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// `entity` is the display name of the missing thing, e.g. `"bill"`.
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// `entity` is the display name of the conflicting thing, e.g. `"room number"`.
    pub fn duplicate(entity: impl Into<String>) -> Self {
        Self::Duplicate(entity.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidState(_) | Self::Duplicate(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) | Self::Anyhow(_) | Self::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error envelope: `{ "success": false, "error": ..., "details": [...] }`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Never leak internal detail to the client.
        let (error, details) = match &self {
            Self::Internal(_) | Self::Anyhow(_) | Self::Database(_) => {
                tracing::error!(error = %self, "request failed");
                ("Internal server error".to_string(), None)
            }
            Self::Validation { message, details } if !details.is_empty() => {
                (message.clone(), Some(details.clone()))
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            success: false,
            error,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Convenience result alias used throughout the crate.
pub type Result<T, E = ApiError> = std::result::Result<T, E>;
