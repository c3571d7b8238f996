use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{auth, bookings, events, health_check, users};
use crate::state::AppState;

/// Event media runs through multipart uploads; allow a bit more than the
/// axum default.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn create_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/events", get(events::list_events))
        .route("/events/:id", get(events::event_detail));

    // Bearer auth is enforced per handler through the AuthUser extractor.
    let user = Router::new()
        .route("/user/create-event", post(events::create_event))
        .route(
            "/user/edit-event/:id",
            get(events::edit_event_fetch).put(events::edit_event_update),
        )
        .route("/user/book-tickets", post(bookings::book_tickets))
        .route("/user/cancel-booking/:id", delete(bookings::cancel_booking))
        .route("/user/booking/:custom_id", get(bookings::booking_detail))
        .route("/user/user-profile", get(users::user_profile))
        .route("/user/all-user-data", get(users::all_user_data));

    Router::new()
        .merge(public)
        .merge(user)
        .nest_service("/media", ServeDir::new(&state.config.media_root))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
