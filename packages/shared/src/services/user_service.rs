use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use chrono::Utc;
use tracing::{debug, info};

use crate::models::user::{
    RegisterUserRequest, UpdateProfileRequest, User, UserProfile, MAX_DISPLAY_NAME_LEN,
};
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use crate::repositories::user_repository::UserRepository;
use crate::services::errors::user_service_errors::UserServiceError;

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=30;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository + Send + Sync>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository + Send + Sync>) -> Self {
        UserService { repository }
    }

    pub async fn register(
        &self,
        request: RegisterUserRequest,
    ) -> Result<UserProfile, UserServiceError> {
        validate_registration(&request)?;

        let password_hash = hash_password(&request.password)?;
        let mut user = User::new(
            request.username.trim().to_string(),
            request.email.trim().to_lowercase(),
            password_hash,
        );
        user.display_name = request.display_name;

        self.repository
            .create_user(&user)
            .await
            .map_err(|e| match e {
                UserRepositoryError::AlreadyExists => UserServiceError::UserAlreadyExists,
                _ => UserServiceError::RepositoryError(e.to_string()),
            })?;
        info!("Registered user {} ({})", user.username, user.id);
        Ok(user.into())
    }

    /// Profile of `user_id`, or of the earliest registered user when no
    /// caller is identified.
    pub async fn get_profile(&self, user_id: Option<&str>) -> Result<UserProfile, UserServiceError> {
        Ok(self.resolve_user(user_id).await?.into())
    }

    pub async fn update_profile(
        &self,
        user_id: Option<&str>,
        update: UpdateProfileRequest,
    ) -> Result<UserProfile, UserServiceError> {
        update.validate().map_err(UserServiceError::ValidationError)?;

        let mut user = self.resolve_user(user_id).await?;
        update.apply_to(&mut user);
        user.updated_at = Utc::now();

        self.repository
            .update_user(&user)
            .await
            .map_err(|e| match e {
                UserRepositoryError::NotFound => UserServiceError::UserNotFound,
                _ => UserServiceError::RepositoryError(e.to_string()),
            })?;
        debug!("Updated profile for user {}", user.id);
        Ok(user.into())
    }

    async fn resolve_user(&self, user_id: Option<&str>) -> Result<User, UserServiceError> {
        match user_id.filter(|id| !id.is_empty()) {
            Some(id) => self
                .repository
                .get_user_by_id(id)
                .await
                .map_err(|e| match e {
                    UserRepositoryError::NotFound => UserServiceError::UserNotFound,
                    _ => UserServiceError::RepositoryError(e.to_string()),
                }),
            None => self
                .repository
                .list_users(1)
                .await
                .map_err(|e| UserServiceError::RepositoryError(e.to_string()))?
                .into_iter()
                .next()
                .ok_or(UserServiceError::UserNotFound),
        }
    }
}

fn validate_registration(request: &RegisterUserRequest) -> Result<(), UserServiceError> {
    let username = request.username.trim();
    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(UserServiceError::ValidationError(format!(
            "username must be between {} and {} characters",
            USERNAME_LEN.start(),
            USERNAME_LEN.end()
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(UserServiceError::ValidationError(
            "username may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    let email = request.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => {
            return Err(UserServiceError::ValidationError(
                "email is not a valid address".to_string(),
            ))
        }
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(UserServiceError::ValidationError(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if let Some(display_name) = &request.display_name {
        if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "display_name must be at most {} characters",
                MAX_DISPLAY_NAME_LEN
            )));
        }
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, UserServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserServiceError::PasswordHashError(e.to_string()))
}
