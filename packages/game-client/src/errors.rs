use shared::models::api_response::{ErrorCode, ErrorKind};
use shared::services::errors::chess_service_errors::ChessServiceError;

/// A failed exchange with the game server.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// No response within the per-attempt timeout.
    Timeout,
    Network(String),
    /// The server answered with a failure envelope or a non-success status.
    Status {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },
    Decode(String),
}

impl TransportError {
    /// Failure class, when the server reported one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            TransportError::Status {
                code: Some(code), ..
            } => Some(code.kind()),
            TransportError::Status { status, .. } => match status {
                404 => Some(ErrorKind::NotFound),
                400 | 422 => Some(ErrorKind::InvalidInput),
                409 => Some(ErrorKind::Conflict),
                s if *s >= 500 => Some(ErrorKind::Internal),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            TransportError::Status { code, .. } => *code,
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout | TransportError::Network(_) => true,
            TransportError::Decode(_) => false,
            TransportError::Status {
                code: Some(code), ..
            } => code.is_retryable(),
            TransportError::Status { status, .. } => {
                *status >= 500 || matches!(status, 408 | 409 | 429)
            }
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "Request timed out"),
            TransportError::Network(msg) => write!(f, "Network error: {}", msg),
            TransportError::Status {
                status,
                code: Some(code),
                message,
            } => write!(f, "Server rejected request ({} {:?}): {}", status, code, message),
            TransportError::Status {
                status, message, ..
            } => write!(f, "Server returned {}: {}", status, message),
            TransportError::Decode(msg) => write!(f, "Malformed response: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// A move for this game is still awaiting the server.
    MoveInFlight,
    /// The local rules rejected the move; nothing was sent.
    IllegalLocalMove(ChessServiceError),
    Transport(TransportError),
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileError::MoveInFlight => write!(f, "A move is already awaiting confirmation"),
            ReconcileError::IllegalLocalMove(err) => write!(f, "Illegal move: {}", err),
            ReconcileError::Transport(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ReconcileError {}

impl From<TransportError> for ReconcileError {
    fn from(err: TransportError) -> Self {
        ReconcileError::Transport(err)
    }
}
