use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use crate::{
    auth::{jwt::JwtKeys, repo::UserStore, repo_types::User},
    error::AppError,
    state::AppState,
};

pub const TOKEN_MISSING: &str = "Not authorized, token missing";
pub const TOKEN_INVALID: &str = "Not authorized, token invalid";
pub const USER_NOT_FOUND: &str = "Not authorized, user not found";

/// Token from `Authorization: Bearer <token>`, if the header has that shape.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the bearer token in `headers` to a live user.
///
/// Every verification failure (expired, forged, malformed) maps to the same
/// `TOKEN_INVALID` answer.
pub async fn authorize(
    headers: &HeaderMap,
    keys: &JwtKeys,
    users: &dyn UserStore,
) -> Result<User, AppError> {
    let token =
        bearer_token(headers).ok_or_else(|| AppError::Unauthorized(TOKEN_MISSING.into()))?;

    let claims = match keys.verify(token) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "rejected bearer token");
            return Err(AppError::Unauthorized(TOKEN_INVALID.into()));
        }
    };

    match users.find_by_id(claims.sub).await? {
        Some(user) => {
            debug!(user_id = %user.id, "request authorized");
            Ok(user)
        }
        None => {
            warn!(user_id = %claims.sub, "token for missing user");
            Err(AppError::Unauthorized(USER_NOT_FOUND.into()))
        }
    }
}

/// The authenticated caller. Handlers taking this only run after `authorize` succeeded.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authorize(&parts.headers, &state.keys, state.users.as_ref()).await?;
        Ok(AuthUser(user))
    }
}
