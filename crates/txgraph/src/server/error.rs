use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use txgraph_core::error::{CoreError, LookupError};

// ==============================================================================
// Error Type
// ==============================================================================

#[derive(Debug)]
pub(crate) enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Unprocessable(String),
    BadGateway(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Decode(_) | CoreError::InvalidUtxoKey(_) | CoreError::Config(_) => {
                Self::BadRequest(message)
            }
            CoreError::Lookup(LookupError::MissingCredential(_)) => Self::BadRequest(message),
            CoreError::Lookup(LookupError::NotFound(_)) | CoreError::InputNotFound { .. } => {
                Self::NotFound(message)
            }
            CoreError::TxNotInGraph(_) | CoreError::UtxoNotInGraph(_) => Self::NotFound(message),
            CoreError::AliasTooLong { .. } | CoreError::NetworkMismatch { .. } => {
                Self::Unprocessable(message)
            }
            CoreError::Resolution(inner) => match Self::from(*inner) {
                Self::NotFound(_) => Self::NotFound(message),
                Self::BadRequest(_) => Self::BadRequest(message),
                _ => Self::BadGateway(message),
            },
            CoreError::Lookup(_) | CoreError::MalformedAssetUnit(_) => Self::BadGateway(message),
        }
    }
}
