use axum::extract::State;
use axum::response::Response;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::{AuthUser, StaffUser};
use crate::models::booking::{Booking, BookingJson};
use crate::models::event::{Event, EventJson};
use crate::models::user::User;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::ok;

/// Per-user aggregation: identity fields, the user's bookings, and the
/// events they organize.
#[derive(Debug, Serialize)]
pub struct ProfileJson {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub username: String,
    pub email: String,
    pub bookings: Vec<BookingJson>,
    pub created_events: Vec<EventJson>,
}

/// GET /user/user-profile
pub async fn user_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    let user = User::find(&state.pool, auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let public_base = state.config.public_base_url.as_deref();
    let booking_details = Booking::list_for_user(&state.pool, user.id).await?;
    let bookings = Booking::project(&state.pool, booking_details, public_base).await?;
    let event_details = Event::list_by_owner(&state.pool, user.id).await?;
    let created_events = Event::project(&state.pool, event_details, public_base).await?;

    Ok(ok(ProfileJson {
        id: user.id,
        first_name: user.first_name,
        username: user.username,
        email: user.email,
        bookings,
        created_events,
    }))
}

/// GET /user/all-user-data — staff only: the profile aggregation for every
/// account.
pub async fn all_user_data(
    State(state): State<AppState>,
    StaffUser(_admin): StaffUser,
) -> Result<Response, AppError> {
    let public_base = state.config.public_base_url.as_deref();

    let users = User::list_all(&state.pool).await?;
    let mut bookings_by_user =
        Booking::project_grouped(&state.pool, Booking::list_all(&state.pool).await?, public_base)
            .await?;

    // Events are grouped the same way the bookings are: one query for the
    // rows, one for their galleries.
    let event_details = Event::list(&state.pool, None).await?;
    let owners: Vec<Uuid> = event_details.iter().map(|d| d.user_id).collect();
    let events = Event::project(&state.pool, event_details, public_base).await?;
    let mut events_by_user: HashMap<Uuid, Vec<EventJson>> = HashMap::new();
    for (owner, event) in owners.into_iter().zip(events) {
        events_by_user.entry(owner).or_default().push(event);
    }

    let profiles: Vec<ProfileJson> = users
        .into_iter()
        .map(|user| ProfileJson {
            bookings: bookings_by_user.remove(&user.id).unwrap_or_default(),
            created_events: events_by_user.remove(&user.id).unwrap_or_default(),
            id: user.id,
            first_name: user.first_name,
            username: user.username,
            email: user.email,
        })
        .collect();

    Ok(ok(profiles))
}
