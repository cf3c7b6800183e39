pub mod games;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::StoreConfig;

pub use games::SqliteGameRepository;
pub use users::SqliteUserRepository;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE CHECK (length(username) BETWEEN 3 AND 30),
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        display_name TEXT CHECK (display_name IS NULL OR length(display_name) <= 50),
        bio TEXT CHECK (bio IS NULL OR length(bio) <= 500),
        country TEXT,
        elo_rating INTEGER NOT NULL DEFAULT 1200,
        games_played INTEGER NOT NULL DEFAULT 0 CHECK (games_played >= 0),
        games_won INTEGER NOT NULL DEFAULT 0 CHECK (games_won >= 0),
        games_drawn INTEGER NOT NULL DEFAULT 0 CHECK (games_drawn >= 0),
        games_lost INTEGER NOT NULL DEFAULT 0 CHECK (games_lost >= 0),
        preferences TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS games (
        id TEXT PRIMARY KEY,
        white_player_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        black_player_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        status TEXT NOT NULL DEFAULT 'waiting' CHECK (status IN
            ('waiting', 'active', 'completed', 'aborted', 'draw_offered', 'adjourned')),
        time_initial INTEGER NOT NULL CHECK (time_initial > 0),
        time_increment INTEGER NOT NULL CHECK (time_increment >= 0),
        winner_id TEXT REFERENCES users(id) ON DELETE SET NULL,
        result TEXT CHECK (result IS NULL OR result IN ('1-0', '0-1', '1/2-1/2', '*')),
        termination TEXT CHECK (termination IS NULL OR termination IN
            ('checkmate', 'resignation', 'timeout', 'stalemate', 'insufficient_material',
             'threefold_repetition', '50_move_rule', 'draw_agreement', 'abandoned')),
        started_at TEXT,
        ended_at TEXT,
        current_fen TEXT NOT NULL,
        game_pgn TEXT,
        white_time_left INTEGER NOT NULL CHECK (white_time_left >= 0),
        black_time_left INTEGER NOT NULL CHECK (black_time_left >= 0),
        move_count INTEGER NOT NULL DEFAULT 0 CHECK (move_count >= 0),
        last_move_at TEXT,
        created_at TEXT NOT NULL,
        CHECK (white_player_id <> black_player_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_games_status ON games (status)",
    "CREATE INDEX IF NOT EXISTS idx_games_created_at ON games (created_at)",
    "CREATE TABLE IF NOT EXISTS game_moves (
        id TEXT PRIMARY KEY,
        game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
        move_number INTEGER NOT NULL CHECK (move_number > 0),
        color TEXT NOT NULL CHECK (color IN ('white', 'black')),
        from_square TEXT NOT NULL CHECK (from_square GLOB '[a-h][1-8]'),
        to_square TEXT NOT NULL CHECK (to_square GLOB '[a-h][1-8]'),
        piece_moved TEXT NOT NULL CHECK (piece_moved IN
            ('pawn', 'knight', 'bishop', 'rook', 'queen', 'king')),
        captured_piece TEXT CHECK (captured_piece IS NULL OR captured_piece IN
            ('pawn', 'knight', 'bishop', 'rook', 'queen', 'king')),
        is_castling INTEGER NOT NULL DEFAULT 0,
        is_en_passant INTEGER NOT NULL DEFAULT 0,
        promotion_piece TEXT CHECK (promotion_piece IS NULL OR promotion_piece IN
            ('knight', 'bishop', 'rook', 'queen')),
        check_status TEXT CHECK (check_status IS NULL OR check_status IN ('check', 'checkmate')),
        move_notation TEXT NOT NULL,
        position_after TEXT NOT NULL,
        time_taken INTEGER CHECK (time_taken IS NULL OR time_taken >= 0),
        time_left INTEGER NOT NULL CHECK (time_left >= 0),
        created_at TEXT NOT NULL,
        UNIQUE (game_id, move_number, color)
    )",
    "CREATE INDEX IF NOT EXISTS idx_game_moves_game_id ON game_moves (game_id, move_number)",
];

/// Opens the process-wide pool and makes sure the schema exists.
///
/// An in-memory database lives and dies with its connection, so such URLs
/// get exactly one connection that is never reaped.
pub async fn connect(config: &StoreConfig) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = config.is_in_memory();

    let mut options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(config.acquire_timeout);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = SqlitePoolOptions::new().acquire_timeout(config.acquire_timeout);
    let pool_options = if in_memory {
        pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        pool_options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .idle_timeout(config.idle_timeout)
    };

    let pool = pool_options.connect_with(options).await?;
    migrate(&pool).await?;

    info!(
        "Connected to SQLite store at {} (max {} connections)",
        config.database_url,
        pool.options().get_max_connections()
    );
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
