use std::sync::Arc;

use tracing::{debug, info};

use crate::models::game::{Game, GameDetails, GameStatus, TimeControl};
use crate::repositories::game_repository::GameRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::errors::game_service_errors::GameServiceError;

pub const DEFAULT_LIST_LIMIT: u32 = 10;
pub const MAX_LIST_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct GameService {
    games: Arc<dyn GameRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
}

impl GameService {
    pub fn new(
        games: Arc<dyn GameRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        GameService { games, users }
    }

    /// Starts a game between the two earliest registered users.
    pub async fn create_game(
        &self,
        time_control: Option<TimeControl>,
    ) -> Result<Game, GameServiceError> {
        let time_control = time_control.unwrap_or_default();
        if time_control.initial == 0 {
            return Err(GameServiceError::ValidationError(
                "time_control.initial must be greater than zero".to_string(),
            ));
        }

        let players = self.users.list_users(2).await?;
        let (white, black) = match players.as_slice() {
            [white, black, ..] => (white, black),
            _ => return Err(GameServiceError::InsufficientPlayers),
        };

        let game = Game::new(&white.id, &black.id, time_control);
        self.games.create_game(&game).await?;
        info!(
            "Created game {} ({} vs {})",
            game.id, white.username, black.username
        );
        Ok(game)
    }

    pub async fn get_game(&self, game_id: &str) -> Result<GameDetails, GameServiceError> {
        let game = self
            .games
            .get_game(game_id)
            .await?
            .ok_or_else(|| GameServiceError::GameNotFound(game_id.to_string()))?;
        let moves = self.games.list_moves(game_id).await?;
        Ok(GameDetails { game, moves })
    }

    pub async fn list_games(
        &self,
        status: Option<GameStatus>,
        limit: Option<u32>,
    ) -> Result<Vec<Game>, GameServiceError> {
        let limit = limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        debug!("Listing up to {} games", limit);
        Ok(self.games.list_games(status, limit).await?)
    }
}
