//! JWT-based authentication extractor for Axum handlers.

use axum::extract::OptionalFromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use storyme_core::error::CoreError;

use crate::auth::jwt::{validate_token, JwtConfig, TIER_PREMIUM};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// Extract as `Option<AuthUser>` in handlers where only some inputs need a
/// login:
///
/// ```ignore
/// async fn my_handler(user: Option<AuthUser>) -> AppResult<Json<()>> {
///     let user = user.ok_or_else(|| AppError::Core(CoreError::Unauthorized("Login required".into())))?;
///     tracing::info!(user_id = %user.user_id, tier = %user.tier, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's account id (from `claims.sub`).
    pub user_id: String,
    /// The user's account tier (e.g. `"free"`, `"premium"`).
    pub tier: String,
}

impl AuthUser {
    /// Authenticate from raw request headers.
    pub fn from_headers(headers: &HeaderMap, jwt: &JwtConfig) -> Result<Self, AppError> {
        let auth_header = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            tier: claims.tier,
        })
    }

    pub fn is_premium(&self) -> bool {
        self.tier == TIER_PREMIUM
    }

    /// Reject with 403 Forbidden unless the account is premium.
    pub fn require_premium(self) -> Result<Self, AppError> {
        if self.is_premium() {
            Ok(self)
        } else {
            Err(AppError::Core(CoreError::Forbidden(
                "Premium account required".into(),
            )))
        }
    }
}

/// Optional authentication: a request without an `Authorization` header
/// yields `None`, while a malformed or expired token is still rejected.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(None);
        }
        AuthUser::from_headers(&parts.headers, &state.config.jwt).map(Some)
    }
}
