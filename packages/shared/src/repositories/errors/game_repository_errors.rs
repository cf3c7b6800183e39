#[derive(Debug)]
pub enum GameRepositoryError {
    NotFound,
    /// The stored game no longer matches the version the write was based on.
    Conflict,
    PoolExhausted,
    Serialization(String),
    Sqlite(String),
    DynamoDb(String),
}

impl std::fmt::Display for GameRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameRepositoryError::NotFound => write!(f, "Game not found"),
            GameRepositoryError::Conflict => {
                write!(f, "Game was modified by a concurrent write")
            }
            GameRepositoryError::PoolExhausted => {
                write!(f, "Timed out waiting for a database connection")
            }
            GameRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            GameRepositoryError::Sqlite(msg) => write!(f, "SQLite error: {}", msg),
            GameRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for GameRepositoryError {}
