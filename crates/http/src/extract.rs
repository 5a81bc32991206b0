//! Request extractors shared by module handlers.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde_json::Value;

use crate::error::AppError;

/// A JSON request body that tolerates being absent.
///
/// An empty body becomes `Value::Null` so shape checks can report it, and
/// unparseable bodies reject with a 400 in the standard error format rather
/// than axum's plain-text rejection. The `Content-Type` header is not required.
#[derive(Debug, Clone)]
pub struct JsonPayload(pub Value);

impl<S> FromRequest<S> for JsonPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(Value::Null));
        }

        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| AppError::bad_request(format!("malformed JSON body: {e}")))
    }
}
