//! Bearer-credential extraction for handlers.
//!
//! Credentials arrive either as a `token` query parameter (EventSource
//! cannot set headers) or as an `Authorization: Bearer` header. The
//! query parameter wins when both are present.

use std::collections::HashMap;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};

use mailpilot_core::AuthVerifier;

use crate::error::ApiError;
use crate::ApiState;

/// Query parameter carrying the bearer credential.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Pull the bearer credential out of the request, if any.
pub fn bearer_credential(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> Option<String> {
    if let Some(token) = query.get(TOKEN_QUERY_PARAM) {
        return Some(token.clone());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

/// Resolve the request's credential to an identity, or fail with 401.
pub fn authenticate(
    state: &ApiState,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> Result<String, ApiError> {
    let credential = bearer_credential(headers, query).ok_or_else(|| {
        ApiError::new(StatusCode::UNAUTHORIZED, "missing bearer credential")
    })?;
    Ok(state.auth.verify(&credential)?)
}
