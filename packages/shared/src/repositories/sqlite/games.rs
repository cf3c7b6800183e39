use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::models::game::{Game, GameStatus, TimeControl};
use crate::models::game_move::GameMove;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::game_repository::{GameRepository, GameVersion};
use crate::repositories::sqlite::{is_unique_violation, to_i64};

const GAME_COLUMNS: &str = "id, white_player_id, black_player_id, status, time_initial, \
    time_increment, winner_id, result, termination, started_at, ended_at, current_fen, game_pgn, \
    white_time_left, black_time_left, move_count, last_move_at, created_at";

const MOVE_COLUMNS: &str = "id, game_id, move_number, color, from_square, to_square, \
    piece_moved, captured_piece, is_castling, is_en_passant, promotion_piece, check_status, \
    move_notation, position_after, time_taken, time_left, created_at";

#[derive(Debug, sqlx::FromRow)]
struct GameRow {
    id: String,
    white_player_id: String,
    black_player_id: String,
    status: String,
    time_initial: i64,
    time_increment: i64,
    winner_id: Option<String>,
    result: Option<String>,
    termination: Option<String>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    current_fen: String,
    game_pgn: Option<String>,
    white_time_left: i64,
    black_time_left: i64,
    move_count: i64,
    last_move_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<GameRow> for Game {
    type Error = GameRepositoryError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        Ok(Game {
            status: parse(&row.status)?,
            time_control: TimeControl {
                initial: to_u32(row.time_initial)?,
                increment: to_u32(row.time_increment)?,
            },
            result: parse_optional(row.result.as_deref())?,
            termination: parse_optional(row.termination.as_deref())?,
            white_time_left: to_u32(row.white_time_left)?,
            black_time_left: to_u32(row.black_time_left)?,
            move_count: to_u32(row.move_count)?,
            id: row.id,
            white_player_id: row.white_player_id,
            black_player_id: row.black_player_id,
            winner_id: row.winner_id,
            started_at: row.started_at,
            ended_at: row.ended_at,
            current_position: row.current_fen,
            game_pgn: row.game_pgn,
            last_move_at: row.last_move_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MoveRow {
    id: String,
    game_id: String,
    move_number: i64,
    color: String,
    from_square: String,
    to_square: String,
    piece_moved: String,
    captured_piece: Option<String>,
    is_castling: bool,
    is_en_passant: bool,
    promotion_piece: Option<String>,
    check_status: Option<String>,
    move_notation: String,
    position_after: String,
    time_taken: Option<i64>,
    time_left: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<MoveRow> for GameMove {
    type Error = GameRepositoryError;

    fn try_from(row: MoveRow) -> Result<Self, Self::Error> {
        Ok(GameMove {
            move_number: to_u32(row.move_number)?,
            color: parse(&row.color)?,
            piece_moved: parse(&row.piece_moved)?,
            captured_piece: parse_optional(row.captured_piece.as_deref())?,
            promotion_piece: parse_optional(row.promotion_piece.as_deref())?,
            check_status: parse_optional(row.check_status.as_deref())?,
            time_taken: row.time_taken.map(to_u64).transpose()?,
            time_left: to_u64(row.time_left)?,
            id: row.id,
            game_id: row.game_id,
            from_square: row.from_square,
            to_square: row.to_square,
            is_castling: row.is_castling,
            is_en_passant: row.is_en_passant,
            notation: row.move_notation,
            position_after: row.position_after,
            created_at: row.created_at,
        })
    }
}

fn parse<T>(raw: &str) -> Result<T, GameRepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| GameRepositoryError::Serialization(e.to_string()))
}

fn parse_optional<T>(raw: Option<&str>) -> Result<Option<T>, GameRepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(parse).transpose()
}

fn to_u32(value: i64) -> Result<u32, GameRepositoryError> {
    u32::try_from(value)
        .map_err(|_| GameRepositoryError::Serialization(format!("Out of range value: {}", value)))
}

fn to_u64(value: i64) -> Result<u64, GameRepositoryError> {
    u64::try_from(value)
        .map_err(|_| GameRepositoryError::Serialization(format!("Out of range value: {}", value)))
}

fn map_sqlx_error(err: sqlx::Error) -> GameRepositoryError {
    match err {
        sqlx::Error::PoolTimedOut => GameRepositoryError::PoolExhausted,
        other => GameRepositoryError::Sqlite(other.to_string()),
    }
}

pub struct SqliteGameRepository {
    pool: SqlitePool,
}

impl SqliteGameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GameRepository for SqliteGameRepository {
    async fn create_game(&self, game: &Game) -> Result<(), GameRepositoryError> {
        let sql = format!(
            "INSERT INTO games ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            GAME_COLUMNS
        );
        sqlx::query(&sql)
            .bind(&game.id)
            .bind(&game.white_player_id)
            .bind(&game.black_player_id)
            .bind(game.status.as_str())
            .bind(i64::from(game.time_control.initial))
            .bind(i64::from(game.time_control.increment))
            .bind(&game.winner_id)
            .bind(game.result.map(|r| r.as_str()))
            .bind(game.termination.map(|t| t.as_str()))
            .bind(game.started_at)
            .bind(game.ended_at)
            .bind(&game.current_position)
            .bind(&game.game_pgn)
            .bind(i64::from(game.white_time_left))
            .bind(i64::from(game.black_time_left))
            .bind(i64::from(game.move_count))
            .bind(game.last_move_at)
            .bind(game.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    GameRepositoryError::Conflict
                } else {
                    map_sqlx_error(e)
                }
            })?;

        Ok(())
    }

    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError> {
        let sql = format!("SELECT {} FROM games WHERE id = ?", GAME_COLUMNS);
        let row = sqlx::query_as::<_, GameRow>(&sql)
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Game::try_from).transpose()
    }

    async fn list_games(
        &self,
        status: Option<GameStatus>,
        limit: u32,
    ) -> Result<Vec<Game>, GameRepositoryError> {
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM games WHERE status = ? \
                     ORDER BY julianday(created_at) DESC, rowid DESC LIMIT ?",
                    GAME_COLUMNS
                );
                sqlx::query_as::<_, GameRow>(&sql)
                    .bind(status.as_str())
                    .bind(i64::from(limit))
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM games ORDER BY julianday(created_at) DESC, rowid DESC LIMIT ?",
                    GAME_COLUMNS
                );
                sqlx::query_as::<_, GameRow>(&sql)
                    .bind(i64::from(limit))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(Game::try_from).collect()
    }

    async fn list_moves(&self, game_id: &str) -> Result<Vec<GameMove>, GameRepositoryError> {
        let sql = format!(
            "SELECT {} FROM game_moves WHERE game_id = ? \
             ORDER BY move_number, CASE color WHEN 'white' THEN 0 ELSE 1 END",
            MOVE_COLUMNS
        );
        let rows = sqlx::query_as::<_, MoveRow>(&sql)
            .bind(game_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(GameMove::try_from).collect()
    }

    async fn append_move(
        &self,
        expected: &GameVersion,
        updated: &Game,
        game_move: &GameMove,
    ) -> Result<(), GameRepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let updated_rows = sqlx::query(
            "UPDATE games SET status = ?, winner_id = ?, result = ?, termination = ?, \
             started_at = ?, ended_at = ?, current_fen = ?, game_pgn = ?, white_time_left = ?, \
             black_time_left = ?, move_count = ?, last_move_at = ? \
             WHERE id = ? AND move_count = ? AND current_fen = ?",
        )
        .bind(updated.status.as_str())
        .bind(&updated.winner_id)
        .bind(updated.result.map(|r| r.as_str()))
        .bind(updated.termination.map(|t| t.as_str()))
        .bind(updated.started_at)
        .bind(updated.ended_at)
        .bind(&updated.current_position)
        .bind(&updated.game_pgn)
        .bind(i64::from(updated.white_time_left))
        .bind(i64::from(updated.black_time_left))
        .bind(i64::from(updated.move_count))
        .bind(updated.last_move_at)
        .bind(&updated.id)
        .bind(i64::from(expected.move_count))
        .bind(&expected.position)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        if updated_rows == 0 {
            debug!("Stale write rejected for game {}", updated.id);
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(GameRepositoryError::Conflict);
        }

        let sql = format!(
            "INSERT INTO game_moves ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            MOVE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(&game_move.id)
            .bind(&game_move.game_id)
            .bind(i64::from(game_move.move_number))
            .bind(game_move.color.as_str())
            .bind(&game_move.from_square)
            .bind(&game_move.to_square)
            .bind(game_move.piece_moved.as_str())
            .bind(game_move.captured_piece.map(|p| p.as_str()))
            .bind(game_move.is_castling)
            .bind(game_move.is_en_passant)
            .bind(game_move.promotion_piece.map(|p| p.as_str()))
            .bind(game_move.check_status.map(|c| c.as_str()))
            .bind(&game_move.notation)
            .bind(&game_move.position_after)
            .bind(game_move.time_taken.map(to_i64))
            .bind(to_i64(game_move.time_left))
            .bind(game_move.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    GameRepositoryError::Conflict
                } else {
                    map_sqlx_error(e)
                }
            })?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
