//! JSON request bodies with list-API status semantics.
//!
//! # Invariants
//! - An empty body deserializes as the payload's default (`{}`), so missing
//!   fields fail in the service with the service's status.
//! - Any other unreadable body is an internal error with no detail in the
//!   response.

use crate::error::ApiError;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use log::error;
use serde::de::DeserializeOwned;

/// JSON body extractor rejecting with [`ApiError`].
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json_content = has_json_content_type(req.headers());
        let path = req.uri().path().to_string();
        let bytes = Bytes::from_request(req, state).await.map_err(|err| {
            error!("event=body_read module=http status=error path={path} error={err}");
            ApiError::Internal
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(T::default()));
        }
        if !json_content {
            error!("event=body_parse module=http status=error path={path} error=non-json content type");
            return Err(ApiError::Internal);
        }

        serde_json::from_slice(&bytes).map(JsonBody).map_err(|err| {
            error!("event=body_parse module=http status=error path={path} error={err}");
            ApiError::Internal
        })
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()) else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
}
