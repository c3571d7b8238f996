use axum::response::Response;
use serde::Serialize;

use crate::utils::response::ok;

pub mod auth;
pub mod bookings;
pub mod events;
pub mod users;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    ok(HealthPayload {
        status: "ok",
        service: "tessera-api",
    })
}
