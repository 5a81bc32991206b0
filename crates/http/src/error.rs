//! Error handling for the Libris HTTP layer
//!
//! Every failure is returned to clients as `{"error": {"message", "status"}}`.
//! Validation failures carry a list of messages instead of a single string.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Error payload as serialized to clients
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: serde_json::Value,
    pub status: u16,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {}", .messages.join("; "))]
    Validation { messages: Vec<String> },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(messages: Vec<String>) -> Self {
        Self::Validation { messages }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the client-facing body for this error.
    pub fn body(&self) -> ErrorEnvelope {
        let message = match self {
            AppError::Validation { messages } => serde_json::json!(messages),
            AppError::NotFound { message } | AppError::BadRequest { message } => {
                serde_json::Value::String(message.clone())
            }
            AppError::Internal(e) => serde_json::Value::String(e.to_string()),
        };

        ErrorEnvelope {
            error: ErrorBody {
                message,
                status: self.status().as_u16(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::now_v7();
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                error = %self,
                "request failed"
            );
        } else {
            tracing::warn!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                error = %self,
                "request rejected"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

/// Give framework-generated failures (unmatched route, 405, timeout) the
/// same body as handler errors. Responses that already declare a content
/// type are left alone.
pub async fn wrap_bare_error(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error())
        || response.headers().contains_key(header::CONTENT_TYPE)
    {
        return response;
    }

    let envelope = ErrorEnvelope {
        error: ErrorBody {
            message: serde_json::Value::String(
                status.canonical_reason().unwrap_or("Request failed").to_string(),
            ),
            status: status.as_u16(),
        },
    };
    let (mut parts, body) = response.into_parts();
    let Ok(bytes) = serde_json::to_vec(&envelope) else {
        return Response::from_parts(parts, body);
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_validation_error() {
        let error = AppError::validation(vec!["title is required".to_string()]);

        match &error {
            AppError::Validation { messages } => {
                assert_eq!(messages, &vec!["title is required".to_string()]);
            }
            _ => panic!("Expected Validation error"),
        }
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_validation_body_lists_messages() {
        let error = AppError::validation(vec![
            "isbn is required".to_string(),
            "pages must be an integer".to_string(),
        ]);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({
                "error": {
                    "message": ["isbn is required", "pages must be an integer"],
                    "status": 400
                }
            })
        );
    }

    #[tokio::test]
    async fn test_not_found_mapping() {
        let response = AppError::not_found("no book with isbn '0h12evq-2'").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["status"], 404);
        assert_eq!(body["error"]["message"], "no book with isbn '0h12evq-2'");
    }

    #[tokio::test]
    async fn test_internal_error_passes_message_through() {
        let error = AppError::Internal(anyhow::anyhow!("UNIQUE constraint failed: books.isbn"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "UNIQUE constraint failed: books.isbn");
        assert_eq!(body["error"]["status"], 500);
    }

    #[tokio::test]
    async fn test_bare_error_gets_envelope() {
        let bare = (StatusCode::REQUEST_TIMEOUT, [("x-request-id", "abc")]).into_response();
        let response = wrap_bare_error(bare).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(response.headers()["x-request-id"], "abc");

        let body = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({ "error": { "message": "Request Timeout", "status": 408 } })
        );
    }

    #[tokio::test]
    async fn test_typed_and_successful_responses_untouched() {
        let typed = AppError::not_found("gone").into_response();
        let body = body_json(wrap_bare_error(typed).await).await;
        assert_eq!(body["error"]["message"], "gone");

        let ok = wrap_bare_error(StatusCode::NO_CONTENT.into_response()).await;
        assert_eq!(ok.status(), StatusCode::NO_CONTENT);
        assert!(ok.headers().get(header::CONTENT_TYPE).is_none());
    }
}
