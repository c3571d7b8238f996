use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::models::booking::{parse_custom_id, Booking};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{Json, Path};
use crate::utils::response::{created, message, ok};

#[derive(Debug, Deserialize, Validate)]
pub struct BookTicketsPayload {
    pub event: Uuid,
    /// Defaults to 1; zero and negative quantities are rejected rather than
    /// silently accepted.
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// POST /user/book-tickets
pub async fn book_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BookTicketsPayload>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let booking_id = Booking::create(
        &state.pool,
        &state.media,
        &state.config.frontend_base_url,
        user.id,
        payload.event,
        payload.quantity,
    )
    .await?;

    tracing::info!(
        booking_id,
        event = %payload.event,
        quantity = payload.quantity,
        "Tickets booked"
    );

    let detail = Booking::find_for_user(&state.pool, booking_id, user.id)
        .await?
        .ok_or_else(|| AppError::Internal("Created booking vanished".to_string()))?;
    let mut bookings = Booking::project(
        &state.pool,
        vec![detail],
        state.config.public_base_url.as_deref(),
    )
    .await?;
    Ok(created(bookings.remove(0)))
}

/// DELETE /user/cancel-booking/{id} — owner-scoped; tickets cascade.
pub async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let deleted = Booking::delete_owned(&state.pool, id, user.id).await?;
    if !deleted {
        return Err(AppError::NotFound("Booking not found".to_string()));
    }
    Ok(message("Booking cancelled successfully"))
}

/// GET /user/booking/{custom_id} — lookup by the derived identifier.
pub async fn booking_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(custom_id): Path<String>,
) -> Result<Response, AppError> {
    let booking_id = parse_custom_id(&custom_id)
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let detail = Booking::find_for_user(&state.pool, booking_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    let mut bookings = Booking::project(
        &state.pool,
        vec![detail],
        state.config.public_base_url.as_deref(),
    )
    .await?;
    Ok(ok(bookings.remove(0)))
}
