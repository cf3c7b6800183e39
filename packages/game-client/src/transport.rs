use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::TransportError;
use shared::models::api_response::ApiResponse;
use shared::models::game::{CreateGameRequest, Game, GameDetails, GameStatus, TimeControl};
use shared::models::game_state::MoveOutcome;
use shared::models::move_request::MoveRequest;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// The calls the reconciler makes against the game server. One call is one
/// attempt; retrying is up to the caller.
#[async_trait]
pub trait GameTransport: Send + Sync {
    async fn submit_move(
        &self,
        game_id: &str,
        request: &MoveRequest,
    ) -> Result<MoveOutcome, TransportError>;

    async fn get_game(&self, game_id: &str) -> Result<GameDetails, TransportError>;
}

/// HTTP client for the game API.
#[derive(Clone)]
pub struct HttpGameClient {
    client: Client,
    base_url: String,
    user_id: Option<String>,
}

impl HttpGameClient {
    pub fn new(base_url: &str) -> Self {
        HttpGameClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: None,
        }
    }

    /// Identifies requests as coming from `user_id`.
    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub async fn create_game(
        &self,
        time_control: Option<TimeControl>,
    ) -> Result<Game, TransportError> {
        let request = self
            .client
            .post(self.url("/games"))
            .json(&CreateGameRequest { time_control });
        self.send(request).await
    }

    pub async fn list_games(
        &self,
        status: Option<GameStatus>,
        limit: Option<u32>,
    ) -> Result<Vec<Game>, TransportError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(status) = status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let request = self.client.get(self.url("/games")).query(&query);
        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TransportError> {
        let request = match &self.user_id {
            Some(user_id) => request.header(USER_ID_HEADER, user_id),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!("Game API responded {} ({} bytes)", status, body.len());
        read_envelope(status.as_u16(), &body)
    }
}

#[async_trait]
impl GameTransport for HttpGameClient {
    async fn submit_move(
        &self,
        game_id: &str,
        request: &MoveRequest,
    ) -> Result<MoveOutcome, TransportError> {
        let builder = self
            .client
            .post(self.url(&format!("/games/{}/move", game_id)))
            .json(request);
        self.send(builder).await
    }

    async fn get_game(&self, game_id: &str) -> Result<GameDetails, TransportError> {
        let builder = self.client.get(self.url(&format!("/games/{}", game_id)));
        self.send(builder).await
    }
}

/// Unwraps a response envelope into its data or a classified error.
pub fn read_envelope<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, TransportError> {
    let success = (200..300).contains(&status);
    match serde_json::from_slice::<ApiResponse<T>>(body) {
        Ok(ApiResponse {
            success: true,
            data: Some(data),
            ..
        }) if success => Ok(data),
        Ok(ApiResponse {
            error: Some(error), ..
        }) => Err(TransportError::Status {
            status,
            code: Some(error.code),
            message: error.message,
        }),
        Ok(_) if success => Err(TransportError::Decode(
            "Response envelope carried no data".to_string(),
        )),
        Err(err) if success => Err(TransportError::Decode(err.to_string())),
        _ => Err(TransportError::Status {
            status,
            code: None,
            message: String::from_utf8_lossy(body).into_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::api_response::ErrorCode;

    #[test]
    fn test_envelope_data_is_returned() {
        let body = br#"{"success":true,"data":[1,2],"timestamp":"2024-01-01T00:00:00Z"}"#;
        let data: Vec<u32> = read_envelope(200, body).unwrap();
        assert_eq!(data, vec![1, 2]);
    }

    #[test]
    fn test_envelope_error_is_classified() {
        let body = br#"{"success":false,"error":{"code":"GAME_NOT_ACTIVE","message":"done"},"timestamp":"2024-01-01T00:00:00Z"}"#;
        let err = read_envelope::<Vec<u32>>(400, body).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::GameNotActive));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_plain_error_body_keeps_status() {
        let err = read_envelope::<Vec<u32>>(502, b"Bad Gateway").unwrap_err();
        assert_eq!(
            err,
            TransportError::Status {
                status: 502,
                code: None,
                message: "Bad Gateway".to_string(),
            }
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_garbled_success_is_decode_error() {
        let err = read_envelope::<Vec<u32>>(200, b"{").unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }
}
