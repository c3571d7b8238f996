use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::models::user::User;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::Json;
use crate::utils::response::{created, ok};

#[derive(Debug, Deserialize, Validate)]
pub struct SignupPayload {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub first_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Result<Response, AppError> {
    payload.validate()?;

    // Pre-checks give the friendlier message; the unique constraints catch
    // concurrent duplicates.
    if User::username_taken(&state.pool, &payload.username).await? {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }
    if User::email_taken(&state.pool, &payload.email).await? {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.pool,
        &payload.username,
        &payload.email,
        &password_hash,
        payload.first_name.as_deref(),
    )
    .await?;

    let tokens = state.tokens.issue_pair(user.id, user.is_staff)?;

    tracing::info!(username = %user.username, "Account created");

    Ok(created(json!({
        "msg": "Account created successfully",
        "first_name": user.first_name,
        "username": user.username,
        "access": tokens.access,
        "refresh": tokens.refresh,
    })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let user = User::find_by_username(&state.pool, &payload.username).await?;

    // Hash verification runs only for known accounts; the response does not
    // reveal which half of the pair was wrong.
    let user = match user {
        Some(user) if verify_password(&payload.password, &user.password_hash) => user,
        _ => return Err(AppError::Unauthenticated("Invalid credentials".to_string())),
    };

    let tokens = state.tokens.issue_pair(user.id, user.is_staff)?;

    Ok(ok(json!({
        "access": tokens.access,
        "refresh": tokens.refresh,
        "user": {
            "first_name": user.first_name,
            "username": user.username,
        },
    })))
}
