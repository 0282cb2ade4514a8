// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The uniform response envelope and error mapping for the control API.
//!
//! Every endpoint answers `{success, data | error, message}`. Errors carry
//! the taxonomy short code; internal details (sources, stack context) never
//! leave the process.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use wahub_core::WahubError;

/// Handler result type: a JSON envelope or a mapped error.
pub type ApiResult = Result<Response, ApiError>;

/// Successful envelope around `data`.
pub fn ok<T: Serialize>(data: T) -> Response {
    Json(json!({
        "success": true,
        "data": data,
    }))
    .into_response()
}

/// Successful envelope with an explicit message.
pub fn ok_with_message<T: Serialize>(data: T, message: &str) -> Response {
    Json(json!({
        "success": true,
        "data": data,
        "message": message,
    }))
    .into_response()
}

/// Successful creation envelope (201).
pub fn created<T: Serialize>(data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": data,
        })),
    )
        .into_response()
}

/// Error wrapper mapping the taxonomy onto HTTP statuses.
#[derive(Debug)]
pub struct ApiError(pub WahubError);

impl From<WahubError> for ApiError {
    fn from(err: WahubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WahubError::NotFound { .. } => StatusCode::NOT_FOUND,
            WahubError::BadInput(_) | WahubError::AlreadyExists { .. } => {
                StatusCode::BAD_REQUEST
            }
            WahubError::NotConnected { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "success": false,
            "error": self.0.code(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: WahubError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_statuses() {
        assert_eq!(
            status_of(WahubError::instance_not_found("628")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(WahubError::BadInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(WahubError::AlreadyExists { phone: "628".into() }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(WahubError::NotConnected {
                phone: "628".into(),
                status: "reconnecting".into(),
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(WahubError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(WahubError::Storage {
                source: Box::new(std::io::Error::other("x")),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn ok_envelope_shape() {
        let response = ok(json!({"phone": "628"}));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn created_envelope_is_201() {
        let response = created(json!({"phone": "628"}));
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
