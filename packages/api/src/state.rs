use std::sync::Arc;

use lambda_http::Error;
use tracing::info;

use shared::config::{StorageBackend, StoreConfig};
use shared::repositories::dynamodb::{
    DynamoDbGameRepository, DynamoDbUserRepository, RequestLimiter,
};
use shared::repositories::game_repository::GameRepository;
use shared::repositories::sqlite::{self, SqliteGameRepository, SqliteUserRepository};
use shared::repositories::user_repository::UserRepository;
use shared::services::chess_service::ChessService;
use shared::services::game_service::GameService;
use shared::services::move_coordinator::MoveCoordinator;
use shared::services::user_service::UserService;

#[derive(Clone)]
pub struct AppState {
    pub game_service: Arc<GameService>,
    pub move_coordinator: Arc<MoveCoordinator>,
    pub user_service: Arc<UserService>,
}

impl AppState {
    pub fn new(
        games: Arc<dyn GameRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        AppState {
            game_service: Arc::new(GameService::new(games.clone(), users.clone())),
            move_coordinator: Arc::new(MoveCoordinator::new(
                games,
                Arc::new(ChessService::new()),
            )),
            user_service: Arc::new(UserService::new(users)),
        }
    }

    /// Wires the services to the configured storage backend.
    pub async fn from_config(config: &StoreConfig) -> Result<Self, Error> {
        match config.backend {
            StorageBackend::Sqlite => {
                let pool = sqlite::connect(config).await?;
                Ok(AppState::new(
                    Arc::new(SqliteGameRepository::new(pool.clone())),
                    Arc::new(SqliteUserRepository::new(pool)),
                ))
            }
            StorageBackend::DynamoDb => {
                let aws_config = aws_config::load_from_env().await;
                let client = aws_sdk_dynamodb::Client::new(&aws_config);
                let limiter = RequestLimiter::from_config(config);
                info!(
                    "Using DynamoDB tables {}, {}, {}",
                    config.games_table, config.moves_table, config.users_table
                );
                Ok(AppState::new(
                    Arc::new(DynamoDbGameRepository::new(
                        client.clone(),
                        config,
                        limiter.clone(),
                    )),
                    Arc::new(DynamoDbUserRepository::new(client, config, limiter)),
                ))
            }
        }
    }
}
