use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::error::AppError;

/// The authenticated account behind a request. Extracting this enforces
/// bearer auth; handlers that take an `AuthUser` reject anonymous requests
/// with 401 before running.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub is_staff: bool,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthenticated("Authentication credentials were not provided".into())
            })?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthenticated("Expected a bearer token".into()))?;

        let claims = state.tokens.verify_access(token)?;
        Ok(AuthUser {
            id: claims.sub,
            is_staff: claims.staff,
        })
    }
}

/// Administrator gate layered on top of [`AuthUser`]; non-staff accounts
/// get 403.
#[derive(Debug, Clone, Copy)]
pub struct StaffUser(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(AppError::Forbidden(
                "You do not have permission to perform this action".into(),
            ));
        }
        Ok(StaffUser(user))
    }
}
