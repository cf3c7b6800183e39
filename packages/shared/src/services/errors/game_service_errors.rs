use crate::models::api_response::ErrorCode;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;

#[derive(Debug)]
pub enum GameServiceError {
    GameNotFound(String),
    InsufficientPlayers,
    ValidationError(String),
    RepositoryError(String),
}

impl GameServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GameServiceError::GameNotFound(_) => ErrorCode::GameNotFound,
            GameServiceError::InsufficientPlayers => ErrorCode::InsufficientPlayers,
            GameServiceError::ValidationError(_) => ErrorCode::InvalidInput,
            GameServiceError::RepositoryError(_) => ErrorCode::InternalError,
        }
    }
}

impl std::fmt::Display for GameServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameServiceError::GameNotFound(id) => write!(f, "Game not found: {}", id),
            GameServiceError::InsufficientPlayers => {
                write!(f, "Need at least 2 users to create a game")
            }
            GameServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            GameServiceError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for GameServiceError {}

impl From<GameRepositoryError> for GameServiceError {
    fn from(err: GameRepositoryError) -> Self {
        GameServiceError::RepositoryError(err.to_string())
    }
}

impl From<UserRepositoryError> for GameServiceError {
    fn from(err: UserRepositoryError) -> Self {
        GameServiceError::RepositoryError(err.to_string())
    }
}
