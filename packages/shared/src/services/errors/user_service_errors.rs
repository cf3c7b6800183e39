use crate::models::api_response::ErrorCode;

#[derive(Debug)]
pub enum UserServiceError {
    UserNotFound,
    UserAlreadyExists,
    ValidationError(String),
    PasswordHashError(String),
    RepositoryError(String),
}

impl UserServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            UserServiceError::UserNotFound => ErrorCode::UserNotFound,
            UserServiceError::UserAlreadyExists => ErrorCode::UserAlreadyExists,
            UserServiceError::ValidationError(_) => ErrorCode::InvalidInput,
            UserServiceError::PasswordHashError(_) | UserServiceError::RepositoryError(_) => {
                ErrorCode::InternalError
            }
        }
    }
}

impl std::fmt::Display for UserServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserServiceError::UserNotFound => write!(f, "User not found"),
            UserServiceError::UserAlreadyExists => write!(f, "User already exists"),
            UserServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            UserServiceError::PasswordHashError(msg) => {
                write!(f, "Password hashing error: {}", msg)
            }
            UserServiceError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for UserServiceError {}
