//! HTTP error mapping.
//!
//! Error responses carry only a status code; causes go to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use listshare_core::ListServiceError;
use log::{debug, error};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or invalid bearer token.
    Unauthorized,
    /// A required identifier or field is missing.
    Locked,
    NotFound,
    Internal,
}

impl ApiError {
    pub fn status(self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Locked => StatusCode::LOCKED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.status().into_response()
    }
}

impl From<ListServiceError> for ApiError {
    fn from(value: ListServiceError) -> Self {
        match value {
            ListServiceError::InvalidRequest(details) => {
                debug!("event=api_error module=http status=locked details={details}");
                Self::Locked
            }
            ListServiceError::ListNotFound(id) => {
                debug!("event=api_error module=http status=not_found list_id={id}");
                Self::NotFound
            }
            err @ (ListServiceError::Repo(_) | ListServiceError::InconsistentState(_)) => {
                error!("event=api_error module=http status=error error={err}");
                Self::Internal
            }
        }
    }
}
