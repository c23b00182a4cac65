//! Authentication gate.
//!
//! # Responsibility
//! - Resolve the caller identity from an `Authorization: Bearer` token
//!   before any list operation runs.
//!
//! # Invariants
//! - A request without a valid token never reaches the list service.
//! - The caller id is the token subject and is never blank.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use listshare_core::UserId;
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken(jsonwebtoken::errors::Error),
    BlankSubject,
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingToken => write!(f, "missing bearer token"),
            Self::InvalidToken(err) => write!(f, "invalid token: {err}"),
            Self::BlankSubject => write!(f, "token subject is blank"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidToken(err) => Some(err),
            _ => None,
        }
    }
}

/// Resolves a bearer token to the caller's user id.
pub trait AuthGate: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<UserId, AuthError>;
}

/// Token claims. `_id` is accepted for the subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(alias = "_id")]
    pub sub: UserId,
    pub exp: u64,
}

/// HS256 shared-secret gate.
#[derive(Clone)]
pub struct JwtAuthGate {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
}

impl JwtAuthGate {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Signs a token for `subject` that expires `ttl_secs` from now.
    pub fn issue(&self, subject: &str, ttl_secs: u64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: jsonwebtoken::get_current_timestamp() + ttl_secs,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AuthError::InvalidToken)
    }
}

impl AuthGate for JwtAuthGate {
    fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(AuthError::InvalidToken)?;
        let subject = data.claims.sub.trim();
        if subject.is_empty() {
            return Err(AuthError::BlankSubject);
        }
        Ok(subject.to_string())
    }
}

/// Authenticated caller, extracted from the request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let result = bearer_token(&parts.headers)
            .ok_or(AuthError::MissingToken)
            .and_then(|token| state.auth().authenticate(token));

        match result {
            Ok(user) => Ok(Caller(user)),
            Err(err) => {
                warn!(
                    "event=auth_reject module=http status=error method={} path={} error={err}",
                    parts.method,
                    parts.uri.path()
                );
                Err(ApiError::Unauthorized)
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
