use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::error::AppError;

/// Identity of the caller, taken from a verified bearer token.
///
/// Used both as a per-handler extractor and, through
/// `middleware::from_extractor_with_state`, as the gate in front of every
/// protected router:
///
/// * no token in the `Authorization` header: 401
/// * a token that fails verification: 403
/// * otherwise the request proceeds with the identity attached
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
}

/// Second space-separated part of the header value, as in `Bearer <token>`.
fn bearer_token(header: &str) -> Option<&str> {
    header.split(' ').nth(1).filter(|t| !t.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AppError::MissingToken)?;

        let keys = JwtKeys::from_ref(state);
        let identity = keys.verify(token).map_err(|e| {
            warn!(error = %e, "bearer token rejected");
            AppError::Token(e)
        })?;

        Ok(AuthUser {
            id: identity.user_id,
            email: identity.email,
        })
    }
}
