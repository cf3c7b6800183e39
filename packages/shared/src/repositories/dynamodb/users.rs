use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_attribute_value, to_item};

use crate::config::StoreConfig;
use crate::models::user::User;
use crate::repositories::dynamodb::RequestLimiter;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use crate::repositories::user_repository::UserRepository;

const EMAIL_INDEX: &str = "GSI_UserByEmail";
const USERNAME_INDEX: &str = "GSI_UserByUsername";

pub struct DynamoDbUserRepository {
    pub client: Client,
    pub table_name: String,
    limiter: RequestLimiter,
}

impl DynamoDbUserRepository {
    pub fn new(client: Client, config: &StoreConfig, limiter: RequestLimiter) -> Self {
        Self {
            client,
            table_name: config.users_table.clone(),
            limiter,
        }
    }

    async fn attribute_taken(
        &self,
        index_name: &str,
        attribute: &str,
        value: &str,
    ) -> Result<bool, UserRepositoryError> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(index_name)
            .key_condition_expression("#attribute = :value")
            .expression_attribute_names("#attribute", attribute)
            .expression_attribute_values(
                ":value",
                to_attribute_value(value)
                    .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?,
            )
            .limit(1)
            .send()
            .await
            .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;

        Ok(output.items.as_ref().is_some_and(|items| !items.is_empty()))
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError> {
        let item = to_item(user).map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| UserRepositoryError::PoolExhausted)?;

        if self.attribute_taken(EMAIL_INDEX, "email", &user.email).await?
            || self
                .attribute_taken(USERNAME_INDEX, "username", &user.username)
                .await?
        {
            return Err(UserRepositoryError::AlreadyExists);
        }

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception())
                {
                    UserRepositoryError::AlreadyExists
                } else {
                    UserRepositoryError::DynamoDb(e.to_string())
                }
            })?;
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<User, UserRepositoryError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| UserRepositoryError::PoolExhausted)?;

        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(user_id.to_string()))
            .send()
            .await
            .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;
        if let Some(item) = output.item {
            let user: User =
                from_item(item).map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
            Ok(user)
        } else {
            Err(UserRepositoryError::NotFound)
        }
    }

    async fn list_users(&self, limit: u32) -> Result<Vec<User>, UserRepositoryError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| UserRepositoryError::PoolExhausted)?;

        let mut users: Vec<User> = Vec::new();
        let mut start_key = None;
        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                users.push(
                    from_item(item)
                        .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?,
                );
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        users.truncate(limit as usize);
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<(), UserRepositoryError> {
        let item = to_item(user).map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| UserRepositoryError::PoolExhausted)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_exists(id)")
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception())
                {
                    UserRepositoryError::NotFound
                } else {
                    UserRepositoryError::DynamoDb(e.to_string())
                }
            })?;
        Ok(())
    }
}
