use crate::models::game::{Game, GameStatus};
use crate::models::game_move::GameMove;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// The part of a stored game a move was computed against. A write based on
/// a version that no longer matches is rejected with `Conflict`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameVersion {
    pub move_count: u32,
    pub position: String,
}

impl GameVersion {
    pub fn of(game: &Game) -> Self {
        GameVersion {
            move_count: game.move_count,
            position: game.current_position.clone(),
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn create_game(&self, game: &Game) -> Result<(), GameRepositoryError>;

    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError>;

    /// Newest first, at most `limit` games.
    async fn list_games(
        &self,
        status: Option<GameStatus>,
        limit: u32,
    ) -> Result<Vec<Game>, GameRepositoryError>;

    /// Moves in history order: by move number, white before black.
    async fn list_moves(&self, game_id: &str) -> Result<Vec<GameMove>, GameRepositoryError>;

    /// Stores `game_move` and replaces the game with `updated` as one unit.
    /// Nothing is written unless the stored game still matches `expected`.
    async fn append_move(
        &self,
        expected: &GameVersion,
        updated: &Game,
        game_move: &GameMove,
    ) -> Result<(), GameRepositoryError>;
}
