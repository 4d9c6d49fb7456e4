use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::Identity,
    repository::{Repository, RepositoryState},
};

/// Claims
///
/// Payload of the HS256 tokens issued by the login service. Only `sub` is
/// used to resolve the caller; `exp` is enforced during decoding.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's id.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

/// AuthError
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No bearer token on the request.
    #[error("missing bearer credential")]
    Unauthenticated,
    /// Bad signature, expired, or not a JWT at all.
    #[error("invalid credential: {0}")]
    InvalidCredential(#[from] jsonwebtoken::errors::Error),
}

/// TokenVerifier
///
/// Checks bearer tokens against the server secret and resolves them to an
/// `Identity`. The secret is fixed at construction.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

/// VerifierState
///
/// Shared handle stored in `AppState`.
pub type VerifierState = Arc<TokenVerifier>;

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// decode
    ///
    /// Signature and expiry check only; no lookup.
    pub fn decode(&self, credential: Option<&str>) -> Result<Claims, AuthError> {
        let token = credential.ok_or(AuthError::Unauthenticated)?;
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }

    /// verify
    ///
    /// Decodes the credential and loads the subject's user record.
    ///
    /// A valid token whose user is gone yields `Ok(None)` rather than an error,
    /// and so does a failed lookup. Operations that need a caller must reject
    /// `None` themselves.
    pub async fn verify(
        &self,
        repo: &dyn Repository,
        credential: Option<&str>,
    ) -> Result<Option<Identity>, AuthError> {
        let claims = self.decode(credential)?;

        match repo.find_user(claims.sub).await {
            Ok(Some(user)) => Ok(Some(Identity::from(user))),
            Ok(None) => {
                tracing::warn!(user_id = %claims.sub, "token subject no longer exists");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(user_id = %claims.sub, "identity lookup failed: {:?}", e);
                Ok(None)
            }
        }
    }
}

/// bearer_token
///
/// Pulls the token out of `Authorization: Bearer <token>`. Any other shape
/// counts as no credential.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// AuthUser
///
/// The identity context of an authenticated request. `identity` is `None` when
/// the token was valid but its user could not be resolved.
#[derive(Debug, Clone, Default)]
pub struct AuthUser {
    pub identity: Option<Identity>,
}

/// AuthUser Extractor Implementation
///
/// Reuses the context the auth middleware already stored in the request
/// extensions; otherwise runs the verifier.
///
/// Rejection: 401 with `Access denied.` when no token is present and
/// `Invalid token.` when verification fails.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    VerifierState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<AuthUser>() {
            return Ok(existing.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let verifier = VerifierState::from_ref(state);

        let identity = verifier
            .verify(&*repo, bearer_token(&parts.headers))
            .await
            .map_err(|e| {
                tracing::debug!("rejected credential: {}", e);
                ApiError::from(e)
            })?;

        let auth_user = AuthUser { identity };
        parts.extensions.insert(auth_user.clone());
        Ok(auth_user)
    }
}
