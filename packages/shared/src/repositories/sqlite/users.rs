use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::user::User;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use crate::repositories::sqlite::is_unique_violation;
use crate::repositories::user_repository::UserRepository;

const USER_COLUMNS: &str = "id, username, email, password_hash, display_name, bio, country, \
    elo_rating, games_played, games_won, games_drawn, games_lost, preferences, created_at, \
    updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    display_name: Option<String>,
    bio: Option<String>,
    country: Option<String>,
    elo_rating: i64,
    games_played: i64,
    games_won: i64,
    games_drawn: i64,
    games_lost: i64,
    preferences: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = UserRepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let out_of_range =
            |value: i64| UserRepositoryError::Serialization(format!("Out of range value: {}", value));
        Ok(User {
            elo_rating: i32::try_from(row.elo_rating).map_err(|_| out_of_range(row.elo_rating))?,
            games_played: u32::try_from(row.games_played)
                .map_err(|_| out_of_range(row.games_played))?,
            games_won: u32::try_from(row.games_won).map_err(|_| out_of_range(row.games_won))?,
            games_drawn: u32::try_from(row.games_drawn)
                .map_err(|_| out_of_range(row.games_drawn))?,
            games_lost: u32::try_from(row.games_lost).map_err(|_| out_of_range(row.games_lost))?,
            preferences: serde_json::from_str(&row.preferences)
                .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?,
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            display_name: row.display_name,
            bio: row.bio,
            country: row.country,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn map_sqlx_error(err: sqlx::Error) -> UserRepositoryError {
    if is_unique_violation(&err) {
        return UserRepositoryError::AlreadyExists;
    }
    match err {
        sqlx::Error::PoolTimedOut => UserRepositoryError::PoolExhausted,
        other => UserRepositoryError::Sqlite(other.to_string()),
    }
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError> {
        let preferences = serde_json::to_string(&user.preferences)
            .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
        let sql = format!(
            "INSERT INTO users ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            USER_COLUMNS
        );
        sqlx::query(&sql)
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.display_name)
            .bind(&user.bio)
            .bind(&user.country)
            .bind(i64::from(user.elo_rating))
            .bind(i64::from(user.games_played))
            .bind(i64::from(user.games_won))
            .bind(i64::from(user.games_drawn))
            .bind(i64::from(user.games_lost))
            .bind(preferences)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<User, UserRepositoryError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => User::try_from(row),
            None => Err(UserRepositoryError::NotFound),
        }
    }

    async fn list_users(&self, limit: u32) -> Result<Vec<User>, UserRepositoryError> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY julianday(created_at) ASC, rowid ASC LIMIT ?",
            USER_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn update_user(&self, user: &User) -> Result<(), UserRepositoryError> {
        let preferences = serde_json::to_string(&user.preferences)
            .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
        let updated_rows = sqlx::query(
            "UPDATE users SET username = ?, email = ?, password_hash = ?, display_name = ?, \
             bio = ?, country = ?, elo_rating = ?, games_played = ?, games_won = ?, \
             games_drawn = ?, games_lost = ?, preferences = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(&user.country)
        .bind(i64::from(user.elo_rating))
        .bind(i64::from(user.games_played))
        .bind(i64::from(user.games_won))
        .bind(i64::from(user.games_drawn))
        .bind(i64::from(user.games_lost))
        .bind(preferences)
        .bind(user.updated_at)
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        if updated_rows == 0 {
            return Err(UserRepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Theme, UserPreferences};
    use crate::repositories::sqlite::test_support::memory_pool;

    fn user(username: &str) -> User {
        User::new(
            username.to_string(),
            format!("{}@example.com", username),
            "$argon2id$hash".to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repository = SqliteUserRepository::new(memory_pool().await);
        let user = user("anand");

        repository.create_user(&user).await.unwrap();

        assert_eq!(repository.get_user_by_id(&user.id).await.unwrap(), user);
    }

    #[tokio::test]
    async fn test_get_unknown_user_is_not_found() {
        let repository = SqliteUserRepository::new(memory_pool().await);

        let result = repository.get_user_by_id("missing").await;

        assert!(matches!(result, Err(UserRepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_duplicate_username_or_email_already_exists() {
        let repository = SqliteUserRepository::new(memory_pool().await);
        let original = user("carlsen");
        repository.create_user(&original).await.unwrap();

        let same_name = User::new("carlsen".into(), "other@example.com".into(), "h".into());
        let same_email = User::new("other".into(), "carlsen@example.com".into(), "h".into());

        assert!(matches!(
            repository.create_user(&same_name).await,
            Err(UserRepositoryError::AlreadyExists)
        ));
        assert!(matches!(
            repository.create_user(&same_email).await,
            Err(UserRepositoryError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_list_users_earliest_first() {
        let repository = SqliteUserRepository::new(memory_pool().await);
        let mut first = user("first");
        let second = user("second");
        first.created_at = second.created_at - chrono::Duration::minutes(5);
        repository.create_user(&second).await.unwrap();
        repository.create_user(&first).await.unwrap();

        let users = repository.list_users(10).await.unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();

        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(repository.list_users(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_user_persists_preferences() {
        let repository = SqliteUserRepository::new(memory_pool().await);
        let mut user = user("ding");
        repository.create_user(&user).await.unwrap();

        user.bio = Some("Endgames".to_string());
        user.preferences = UserPreferences {
            theme: Theme::Dark,
            ..UserPreferences::default()
        };
        repository.update_user(&user).await.unwrap();

        let stored = repository.get_user_by_id(&user.id).await.unwrap();
        assert_eq!(stored.bio.as_deref(), Some("Endgames"));
        assert_eq!(stored.preferences.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn test_update_unknown_user_is_not_found() {
        let repository = SqliteUserRepository::new(memory_pool().await);

        let result = repository.update_user(&user("ghost")).await;

        assert!(matches!(result, Err(UserRepositoryError::NotFound)));
    }
}
