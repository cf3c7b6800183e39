use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity taken from the `X-User-Id` header. Without the header the
/// services fall back to the earliest registered user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: Option<String>,
}

impl CurrentUser {
    pub fn id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(CurrentUser::default());
        };
        let value = header
            .to_str()
            .map_err(|_| ApiError::InvalidInput("Invalid X-User-Id header".to_string()))?
            .trim();

        Ok(CurrentUser {
            user_id: (!value.is_empty()).then(|| value.to_string()),
        })
    }
}
