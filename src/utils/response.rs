use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// 200 with a JSON body.
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// 201 with a JSON body.
pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// 200 with a `{"message": ...}` body.
pub fn message(text: impl Into<String>) -> Response {
    (StatusCode::OK, Json(json!({ "message": text.into() }))).into_response()
}

/// Error bodies are a short message keyed `"error"`.
pub fn error_response(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(json!({ "error": text.into() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_sets_201() {
        let response = created(json!({"id": 1}));
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn error_response_sets_status() {
        let response = error_response(StatusCode::NOT_FOUND, "Event not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
