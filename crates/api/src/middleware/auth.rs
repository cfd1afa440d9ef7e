//! `AuthUser` extractor: resolves the calling account from a Bearer JWT.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use pictor_core::error::CoreError;
use pictor_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

const BEARER_SCHEME: &str = "bearer";

/// The calling account.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| CoreError::Unauthorized("Access token rejected".into()))?;
        Ok(Self {
            account_id: claims.sub,
        })
    }
}

/// The credentials of an `Authorization: Bearer <token>` header. The scheme
/// is matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Result<&str, CoreError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| CoreError::Unauthorized("Authentication required".into()))?
        .to_str()
        .map_err(|_| CoreError::Unauthorized("Authorization header is not valid text".into()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => {
            let token = token.trim();
            if token.is_empty() {
                return Err(CoreError::Unauthorized("Bearer token is empty".into()));
            }
            Ok(token)
        }
        _ => Err(CoreError::Unauthorized(
            "Authorization scheme must be Bearer".into(),
        )),
    }
}
