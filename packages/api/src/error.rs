use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use shared::models::api_response::{ApiResponse, ErrorCode, ErrorKind};
use shared::services::errors::{
    game_service_errors::GameServiceError, move_coordinator_errors::MoveCoordinatorError,
    user_service_errors::UserServiceError,
};

#[derive(Debug)]
pub enum ApiError {
    GameService(GameServiceError),
    MoveCoordinator(MoveCoordinatorError),
    UserService(UserServiceError),
    /// Malformed body, query or header.
    InvalidInput(String),
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::GameService(e) => e.code(),
            ApiError::MoveCoordinator(e) => e.code(),
            ApiError::UserService(e) => e.code(),
            ApiError::InvalidInput(_) => ErrorCode::InvalidInput,
        }
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::PreconditionFailed | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::GameService(e) => write!(f, "{}", e),
            ApiError::MoveCoordinator(e) => write!(f, "{}", e),
            ApiError::UserService(e) => write!(f, "{}", e),
            ApiError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<GameServiceError> for ApiError {
    fn from(error: GameServiceError) -> Self {
        ApiError::GameService(error)
    }
}

impl From<MoveCoordinatorError> for ApiError {
    fn from(error: MoveCoordinatorError) -> Self {
        ApiError::MoveCoordinator(error)
    }
}

impl From<UserServiceError> for ApiError {
    fn from(error: UserServiceError) -> Self {
        ApiError::UserService(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let kind = code.kind();
        let message = if kind == ErrorKind::Internal {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status_for(kind),
            Json(ApiResponse::<()>::failure(code, message)),
        )
            .into_response()
    }
}
