use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiEnvelope;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Chat errors
/// - E2xxx: Notification errors
/// - E3xxx: Social (follows/search) errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServiceUnavailable,
    BadRequest,
    PayloadTooLarge,

    // Chat (E1xxx)
    ChatroomNotFound,
    MessageNotFound,
    EmptyMessage,
    SocketClosed,
    SendRejected,

    // Notification (E2xxx)
    NotificationNotFound,
    StreamEnded,
    MalformedEvent,

    // Social (E3xxx)
    DesignerNotFound,
    SearchUnavailable,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::RateLimited => "E0006",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",
            Self::PayloadTooLarge => "E0009",

            // Chat
            Self::ChatroomNotFound => "E1001",
            Self::MessageNotFound => "E1002",
            Self::EmptyMessage => "E1003",
            Self::SocketClosed => "E1004",
            Self::SendRejected => "E1005",

            // Notification
            Self::NotificationNotFound => "E2001",
            Self::StreamEnded => "E2002",
            Self::MalformedEvent => "E2003",

            // Social
            Self::DesignerNotFound => "E3001",
            Self::SearchUnavailable => "E3002",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable | Self::StreamEnded => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ValidationError | Self::BadRequest | Self::EmptyMessage | Self::MalformedEvent => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound
            | Self::ChatroomNotFound
            | Self::MessageNotFound
            | Self::NotificationNotFound
            | Self::DesignerNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::SocketClosed | Self::SendRejected | Self::SearchUnavailable => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal error")]
    Internal(#[from] anyhow::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// The distinguished 401 mapping: any unauthorized upstream response is
    /// normalized into this one user-facing error.
    pub fn session_expired() -> Self {
        Self::new(ErrorCode::Unauthorized, "please log in to continue")
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Known { code, .. } => *code,
            Self::Internal(_) => ErrorCode::InternalError,
            Self::Http(_) => ErrorCode::ServiceUnavailable,
            Self::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, envelope) = match &self {
            AppError::Known { code, message, .. } => (
                code.status_code(),
                ApiEnvelope::<serde_json::Value>::failure(message),
            ),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiEnvelope::failure("internal error"),
                )
            }
            AppError::Http(err) => {
                tracing::error!(error = %err, "upstream http error");
                (
                    StatusCode::BAD_GATEWAY,
                    ApiEnvelope::failure("upstream unavailable"),
                )
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ApiEnvelope::failure(msg))
            }
        };

        (status, Json(envelope)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
