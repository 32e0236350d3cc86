//! Response envelope and the error-to-status boundary.
//!
//! Every JSON response uses the same `{success, data, message}` envelope so
//! the frontend can branch on one shape. [`AccountError`] is translated to a
//! status code in exactly one place; internal detail is logged here and never
//! serialized.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;

use crate::account::error::AccountError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub fn ok(data: T, message: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.to_string(),
        }
    }
}

impl ApiResponse<()> {
    #[must_use]
    pub fn failure(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) | Self::Upload(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // The source chain stays in the logs; clients only see the display
        // message.
        if let Self::Persistence(source) = &self {
            error!("Persistence failure: {source:#}");
        } else if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Internal failure: {self}");
        }

        (status, Json(ApiResponse::failure(&self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn envelope_skips_absent_data() {
        let envelope = ApiResponse::failure("nope");
        let value = serde_json::to_value(&envelope).expect("serialize");
        let object = value.as_object().expect("object");
        assert!(!object.contains_key("data"));
        assert_eq!(
            object.get("success").and_then(serde_json::Value::as_bool),
            Some(false)
        );
    }

    #[test]
    fn error_status_mapping() {
        let cases = [
            (
                AccountError::Validation("v".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (AccountError::Auth("a".to_string()), StatusCode::UNAUTHORIZED),
            (
                AccountError::NotFound("n".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (AccountError::Conflict("c".to_string()), StatusCode::CONFLICT),
            (
                AccountError::Persistence(anyhow!("db down")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
