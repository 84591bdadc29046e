use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::errors::{AppError, ErrorCode};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Router state that knows the shared API secret.
pub trait ApiKeySource {
    fn api_key(&self) -> &str;
}

impl<T: ApiKeySource + ?Sized> ApiKeySource for Arc<T> {
    fn api_key(&self) -> &str {
        (**self).api_key()
    }
}

/// Proof that the request carried the shared API key.
///
/// The key is not tied to a user: it only tells a trusted client apart from
/// everybody else.
#[derive(Debug, Clone, Copy)]
pub struct ApiKeyAuth;

#[axum::async_trait]
impl<S> FromRequestParts<S> for ApiKeyAuth
where
    S: ApiKeySource + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        verify_api_key(&parts.headers, state.api_key())?;
        Ok(ApiKeyAuth)
    }
}

pub fn verify_api_key(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let provided = headers
        .get(API_KEY_HEADER)
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing API key"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid API key header"))?;

    if expected.is_empty() || !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        return Err(AppError::new(ErrorCode::Unauthorized, "invalid API key"));
    }

    Ok(())
}
