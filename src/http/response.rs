use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Standard JSON response wrapper: `{ "success": true, ... }`.
///
/// The payload type must serialize to a JSON object; its keys are merged
/// into the envelope (`{ "success": true, "rooms": [...] }`), matching what
/// API clients consume.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }

    /// Create a 201 Created response.
    pub fn created(data: T) -> CreatedResponse<T> {
        CreatedResponse { data }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// 201 Created response carrying the same envelope.
#[derive(Debug, Serialize)]
pub struct CreatedResponse<T: Serialize> {
    #[serde(flatten)]
    data: T,
}

impl<T: Serialize> IntoResponse for CreatedResponse<T> {
    fn into_response(self) -> Response {
        let body = ApiResponse {
            success: true,
            data: Some(self.data),
            message: None,
        };
        (StatusCode::CREATED, Json(body)).into_response()
    }
}
