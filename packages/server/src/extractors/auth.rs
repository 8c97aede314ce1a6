use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Caller identity taken from the `Authorization: Bearer <token>` header.
///
/// Permissions are the ones baked into the token at login; a role change
/// takes effect on the next login.
#[derive(Debug)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn require_permission(&self, permission: &str) -> Result<(), AppError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        Ok(AuthUser {
            user_id: claims.uid,
            username: claims.sub,
            role: claims.role,
            permissions: claims.permissions,
        })
    }
}

/// A missing header is `TOKEN_MISSING`; anything other than a non-empty
/// bearer credential is `TOKEN_INVALID`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::TokenMissing)?
        .to_str()
        .map_err(|_| AppError::TokenInvalid)?;

    let (scheme, token) = value.split_once(' ').ok_or(AppError::TokenInvalid)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::TokenInvalid);
    }
    Ok(token)
}
