pub mod password;
pub mod token;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// The delivery person behind a valid, unrevoked bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub delivery_person_id: Uuid,
    pub token: String,
    pub expires_at: i64,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        if state.is_token_revoked(token) {
            return Err(AppError::Unauthorized("Token has been revoked".to_string()));
        }

        let claims = state.tokens.verify(token)?;
        let delivery_person_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

        if !state.delivery_persons.contains_key(&delivery_person_id) {
            return Err(AppError::Unauthorized("User not found".to_string()));
        }

        Ok(Self {
            delivery_person_id,
            token: token.to_string(),
            expires_at: claims.exp,
        })
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".to_string()))
}
