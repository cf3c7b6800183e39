use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse failure classes shared by the server and its clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PreconditionFailed,
    InvalidInput,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Conflict | ErrorKind::Internal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    GameNotFound,
    UserNotFound,
    GameNotActive,
    InsufficientPlayers,
    InvalidMove,
    InvalidInput,
    Conflict,
    UserAlreadyExists,
    InternalError,
}

impl ErrorCode {
    pub fn kind(self) -> ErrorKind {
        match self {
            ErrorCode::GameNotFound | ErrorCode::UserNotFound => ErrorKind::NotFound,
            ErrorCode::GameNotActive | ErrorCode::InsufficientPlayers => {
                ErrorKind::PreconditionFailed
            }
            ErrorCode::InvalidMove | ErrorCode::InvalidInput => ErrorKind::InvalidInput,
            ErrorCode::Conflict | ErrorCode::UserAlreadyExists => ErrorKind::Conflict,
            ErrorCode::InternalError => ErrorKind::Internal,
        }
    }

    /// Duplicate registrations conflict permanently; stale move submissions do not.
    pub fn is_retryable(self) -> bool {
        self != ErrorCode::UserAlreadyExists && self.kind().is_retryable()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Envelope wrapping every response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
                details: None,
            }),
            timestamp: Utc::now(),
        }
    }
}
