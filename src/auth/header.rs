//! Bearer token extraction from the `Authorization` header.

use axum::http::{HeaderMap, HeaderValue, header};

use super::errors::AuthError;

/// Authentication scheme expected in the `Authorization` header.
pub const BEARER_SCHEME: &str = "Bearer";

/// Extract the raw token from an `Authorization: Bearer <token>` header.
///
/// The header must split on single spaces into exactly two parts, the first
/// being exactly `Bearer`. `Vary: Authorization` is added to `response`
/// whatever the outcome.
pub fn extract_bearer_token<'a>(
    request: &'a HeaderMap,
    response: &mut HeaderMap,
) -> Result<&'a str, AuthError> {
    response.append(header::VARY, HeaderValue::from_static("Authorization"));

    let Some(value) = request.get(header::AUTHORIZATION) else {
        return Err(AuthError::MissingAuthHeader);
    };
    if value.is_empty() {
        return Err(AuthError::MissingAuthHeader);
    }
    let value = value
        .to_str()
        .map_err(|_| AuthError::MalformedAuthHeader)?;

    let parts: Vec<&str> = value.split(' ').collect();
    let [scheme, token] = parts[..] else {
        return Err(AuthError::MalformedAuthHeader);
    };

    if scheme != BEARER_SCHEME {
        return Err(AuthError::MissingBearerScheme);
    }

    Ok(token)
}
