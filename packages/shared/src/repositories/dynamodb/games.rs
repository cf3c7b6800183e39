use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_item};
use tracing::debug;

use crate::config::StoreConfig;
use crate::models::game::{Color, Game, GameStatus};
use crate::models::game_move::{sort_history, GameMove};
use crate::repositories::dynamodb::RequestLimiter;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::game_repository::{GameRepository, GameVersion};

/// Sort key of the moves table: zero-padded move number, then side.
pub fn move_key(move_number: u32, color: Color) -> String {
    let side = match color {
        Color::White => 0,
        Color::Black => 1,
    };
    format!("{:05}-{}", move_number, side)
}

/// Games keyed by `id`; moves keyed by `game_id` plus `move_key`.
pub struct DynamoDbGameRepository {
    pub client: Client,
    pub games_table: String,
    pub moves_table: String,
    limiter: RequestLimiter,
}

impl DynamoDbGameRepository {
    pub fn new(client: Client, config: &StoreConfig, limiter: RequestLimiter) -> Self {
        Self {
            client,
            games_table: config.games_table.clone(),
            moves_table: config.moves_table.clone(),
            limiter,
        }
    }

    fn game_item(game: &Game) -> Result<HashMap<String, AttributeValue>, GameRepositoryError> {
        to_item(game).map_err(|e| GameRepositoryError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl GameRepository for DynamoDbGameRepository {
    async fn create_game(&self, game: &Game) -> Result<(), GameRepositoryError> {
        let item = Self::game_item(game)?;
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| GameRepositoryError::PoolExhausted)?;

        self.client
            .put_item()
            .table_name(&self.games_table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception())
                {
                    GameRepositoryError::Conflict
                } else {
                    GameRepositoryError::DynamoDb(e.to_string())
                }
            })?;

        Ok(())
    }

    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| GameRepositoryError::PoolExhausted)?;

        let result = self
            .client
            .get_item()
            .table_name(&self.games_table)
            .key("id", AttributeValue::S(game_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        if let Some(item) = result.item {
            let game: Game =
                from_item(item).map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;
            Ok(Some(game))
        } else {
            Ok(None)
        }
    }

    async fn list_games(
        &self,
        status: Option<GameStatus>,
        limit: u32,
    ) -> Result<Vec<Game>, GameRepositoryError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| GameRepositoryError::PoolExhausted)?;

        let mut games: Vec<Game> = Vec::new();
        let mut start_key = None;
        loop {
            let mut request = self
                .client
                .scan()
                .table_name(&self.games_table)
                .set_exclusive_start_key(start_key.take());
            if let Some(status) = status {
                request = request
                    .filter_expression("#status = :status")
                    .expression_attribute_names("#status", "status")
                    .expression_attribute_values(
                        ":status",
                        AttributeValue::S(status.as_str().to_string()),
                    );
            }

            let output = request
                .send()
                .await
                .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                games.push(
                    from_item(item)
                        .map_err(|e| GameRepositoryError::Serialization(e.to_string()))?,
                );
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        games.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        games.truncate(limit as usize);
        Ok(games)
    }

    async fn list_moves(&self, game_id: &str) -> Result<Vec<GameMove>, GameRepositoryError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| GameRepositoryError::PoolExhausted)?;

        let mut moves: Vec<GameMove> = Vec::new();
        let mut start_key = None;
        loop {
            let output = self
                .client
                .query()
                .table_name(&self.moves_table)
                .key_condition_expression("game_id = :game_id")
                .expression_attribute_values(":game_id", AttributeValue::S(game_id.to_string()))
                .consistent_read(true)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                moves.push(
                    from_item(item)
                        .map_err(|e| GameRepositoryError::Serialization(e.to_string()))?,
                );
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        sort_history(&mut moves);
        Ok(moves)
    }

    async fn append_move(
        &self,
        expected: &GameVersion,
        updated: &Game,
        game_move: &GameMove,
    ) -> Result<(), GameRepositoryError> {
        let game_item = Self::game_item(updated)?;
        let mut move_item: HashMap<String, AttributeValue> =
            to_item(game_move).map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;
        move_item.insert(
            "move_key".to_string(),
            AttributeValue::S(move_key(game_move.move_number, game_move.color)),
        );

        let put_game = Put::builder()
            .table_name(&self.games_table)
            .set_item(Some(game_item))
            .condition_expression("move_count = :expected_count AND current_fen = :expected_fen")
            .expression_attribute_values(
                ":expected_count",
                AttributeValue::N(expected.move_count.to_string()),
            )
            .expression_attribute_values(
                ":expected_fen",
                AttributeValue::S(expected.position.clone()),
            )
            .build()
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        let put_move = Put::builder()
            .table_name(&self.moves_table)
            .set_item(Some(move_item))
            .condition_expression("attribute_not_exists(game_id)")
            .build()
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| GameRepositoryError::PoolExhausted)?;

        self.client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().put(put_game).build())
            .transact_items(TransactWriteItem::builder().put(put_move).build())
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_transaction_canceled_exception())
                {
                    debug!("Stale write rejected for game {}", updated.id);
                    GameRepositoryError::Conflict
                } else {
                    GameRepositoryError::DynamoDb(e.to_string())
                }
            })?;

        Ok(())
    }
}
