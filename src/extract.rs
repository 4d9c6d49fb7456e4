use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{HeaderMap, header},
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// ApiJson
///
/// JSON request body whose rejections render as `ApiError`, so a bad body
/// gets the same `{ "errors": [..] }` shape as every other failure.
///
/// An empty body yields `T::default()`: a body-less update leaves the photo
/// unchanged and a body-less comment is an empty comment. A non-empty body
/// must be sent as `application/json`.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Send,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json_content = is_json_content_type(request.headers());

        let bytes = Bytes::from_request(request, state).await.map_err(|e| {
            tracing::debug!("unreadable request body: {}", e);
            ApiError::ValidationFailed("The request body could not be read.")
        })?;

        if bytes.is_empty() {
            return Ok(ApiJson(T::default()));
        }
        if !json_content {
            return Err(ApiError::ValidationFailed(
                "Expected an application/json request body.",
            ));
        }

        let Json(value) = Json::<T>::from_bytes(&bytes).map_err(|e| {
            tracing::debug!("rejected request body: {}", e);
            ApiError::ValidationFailed("Malformed JSON request body.")
        })?;
        Ok(ApiJson(value))
    }
}
