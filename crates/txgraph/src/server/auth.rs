use axum::http::HeaderMap;

use super::error::AppError;

/// Header carrying the per-session token printed at startup.
pub(super) const API_TOKEN_HEADER: &str = "x-api-token";

/// Reject requests whose token does not match the session token.
pub(super) fn check_auth(expected_token: &str, headers: &HeaderMap) -> Result<(), AppError> {
    match headers.get(API_TOKEN_HEADER).map(|v| v.to_str()) {
        Some(Ok(token)) if token == expected_token => Ok(()),
        _ => Err(AppError::Unauthorized(format!(
            "invalid or missing {API_TOKEN_HEADER} header"
        ))),
    }
}
