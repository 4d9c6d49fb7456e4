use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{auth::AuthError, guard::Denial, repository::StoreError, storage::StorageError};

/// ApiError
///
/// Every failure a handler can report. Each variant maps to one status code
/// and renders as `{ "errors": ["<message>"] }`; no machine-readable code is
/// exposed beyond the status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401: no credential, or a verified token whose user no longer exists.
    #[error("{0}")]
    Unauthenticated(&'static str),

    /// 401: malformed, expired or mis-signed token.
    #[error("Invalid token.")]
    InvalidCredential,

    /// 422: authenticated, but the photo belongs to someone else.
    #[error("You are not allowed to change this photo.")]
    NotOwner,

    /// 404: missing resource or malformed identifier.
    #[error("{0}")]
    NotFound(&'static str),

    /// 422: the store accepted the request but produced nothing, or the input
    /// was rejected before reaching it.
    #[error("{0}")]
    ValidationFailed(&'static str),

    /// 500: unexpected store or storage failure.
    #[error("Internal server error.")]
    ServerError,
}

impl ApiError {
    pub const PHOTO_NOT_FOUND: ApiError = ApiError::NotFound("Photo not found.");

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) | ApiError::InvalidCredential => StatusCode::UNAUTHORIZED,
            ApiError::NotOwner | ApiError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "errors": [self.to_string()] }));
        (self.status_code(), body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => ApiError::Unauthenticated("Access denied."),
            AuthError::InvalidCredential(_) => ApiError::InvalidCredential,
        }
    }
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => ApiError::Unauthenticated("User not authenticated."),
            Denial::NotOwner => ApiError::NotOwner,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("store error: {:?}", err);
        ApiError::ServerError
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedType(_) => {
                ApiError::ValidationFailed("Only png and jpg images are accepted.")
            }
            other => {
                tracing::error!("storage error: {:?}", other);
                ApiError::ServerError
            }
        }
    }
}
