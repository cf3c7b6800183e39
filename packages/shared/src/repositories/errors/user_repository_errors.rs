#[derive(Debug)]
pub enum UserRepositoryError {
    NotFound,
    AlreadyExists,
    PoolExhausted,
    Serialization(String),
    Sqlite(String),
    DynamoDb(String),
}

impl std::fmt::Display for UserRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRepositoryError::NotFound => write!(f, "User not found"),
            UserRepositoryError::AlreadyExists => write!(f, "User already exists"),
            UserRepositoryError::PoolExhausted => {
                write!(f, "Timed out waiting for a database connection")
            }
            UserRepositoryError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            UserRepositoryError::Sqlite(msg) => write!(f, "SQLite error: {}", msg),
            UserRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for UserRepositoryError {}
