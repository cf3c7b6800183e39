use crate::models::api_response::ErrorCode;
use crate::models::game::GameStatus;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::services::errors::chess_service_errors::ChessServiceError;

#[derive(Debug)]
pub enum MoveCoordinatorError {
    GameNotFound(String),
    GameNotActive(GameStatus),
    InvalidMove(ChessServiceError),
    /// Another move was stored first; the submission was computed against a stale game.
    Conflict,
    /// The stored position could not be parsed.
    CorruptGame(String),
    RepositoryError(GameRepositoryError),
}

impl MoveCoordinatorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MoveCoordinatorError::GameNotFound(_) => ErrorCode::GameNotFound,
            MoveCoordinatorError::GameNotActive(_) => ErrorCode::GameNotActive,
            MoveCoordinatorError::InvalidMove(_) => ErrorCode::InvalidMove,
            MoveCoordinatorError::Conflict => ErrorCode::Conflict,
            MoveCoordinatorError::CorruptGame(_) | MoveCoordinatorError::RepositoryError(_) => {
                ErrorCode::InternalError
            }
        }
    }
}

impl std::fmt::Display for MoveCoordinatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveCoordinatorError::GameNotFound(id) => write!(f, "Game not found: {}", id),
            MoveCoordinatorError::GameNotActive(status) => {
                write!(f, "Game is not active (status: {})", status.as_str())
            }
            MoveCoordinatorError::InvalidMove(err) => write!(f, "Invalid move: {}", err),
            MoveCoordinatorError::Conflict => {
                write!(f, "Game changed while the move was being applied")
            }
            MoveCoordinatorError::CorruptGame(msg) => write!(f, "Corrupt game state: {}", msg),
            MoveCoordinatorError::RepositoryError(err) => write!(f, "Repository error: {}", err),
        }
    }
}

impl std::error::Error for MoveCoordinatorError {}

impl From<GameRepositoryError> for MoveCoordinatorError {
    fn from(err: GameRepositoryError) -> Self {
        match err {
            GameRepositoryError::Conflict => MoveCoordinatorError::Conflict,
            other => MoveCoordinatorError::RepositoryError(other),
        }
    }
}

impl From<ChessServiceError> for MoveCoordinatorError {
    fn from(err: ChessServiceError) -> Self {
        match err {
            ChessServiceError::InvalidPosition(msg) => MoveCoordinatorError::CorruptGame(msg),
            other => MoveCoordinatorError::InvalidMove(other),
        }
    }
}
