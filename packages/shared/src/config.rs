use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://checkmate.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    DynamoDb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "dynamodb" => Ok(StorageBackend::DynamoDb),
            other => Err(ConfigError::Invalid {
                key: "STORAGE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid { key: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => {
                write!(f, "Invalid value for {}: {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Connection settings for the game store, read from the environment.
///
/// The pool bounds apply to both backends: SQLite uses them for its
/// connection pool and DynamoDB for its in-flight request limiter.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub backend: StorageBackend,
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
    pub games_table: String,
    pub moves_table: String,
    pub users_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: StorageBackend::Sqlite,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 20,
            min_connections: 5,
            idle_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_millis(2000),
            games_table: "games".to_string(),
            moves_table: "game_moves".to_string(),
            users_table: "users".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = StoreConfig::default();
        Ok(StoreConfig {
            backend: env_or("STORAGE_BACKEND", defaults.backend)?,
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections)?,
            idle_timeout: Duration::from_secs(env_or("DB_IDLE_TIMEOUT_SECS", 30)?),
            acquire_timeout: Duration::from_millis(env_or("DB_ACQUIRE_TIMEOUT_MS", 2000)?),
            games_table: std::env::var("GAMES_TABLE").unwrap_or(defaults.games_table),
            moves_table: std::env::var("GAME_MOVES_TABLE").unwrap_or(defaults.moves_table),
            users_table: std::env::var("USERS_TABLE").unwrap_or(defaults.users_table),
        })
    }

    /// A private in-memory SQLite store, used by tests and local tooling.
    pub fn in_memory() -> Self {
        StoreConfig {
            database_url: "sqlite::memory:".to_string(),
            ..StoreConfig::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
