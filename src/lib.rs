use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Identity: token verification and the per-request identity context.
pub mod auth;
// Ownership and authentication decisions.
pub mod guard;
// Like set state machine.
pub mod likes;

pub mod config;
pub mod error;
// JSON body extractor with `ApiError` rejections.
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth::{TokenVerifier, VerifierState};
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockImageStore, S3ImageStore, StorageState};

/// ApiDoc
///
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_photo, handlers::delete_photo, handlers::update_photo,
        handlers::get_photos, handlers::get_user_photos, handlers::get_photo,
        handlers::get_photo_image,
        handlers::search_photos, handlers::like_photo, handlers::comment_photo,
        handlers::presign_image_upload
    ),
    components(
        schemas(
            models::Photo, models::Comment, models::Identity, models::CreatePhotoRequest,
            models::UpdatePhotoRequest, models::CreateCommentRequest,
            models::ImageUploadRequest, models::ImageUploadResponse, models::ImageUrlResponse,
            models::PhotoDeleted,
            models::PhotoUpdated, models::LikeToggled, models::CommentAdded,
            likes::LikeAction,
        )
    ),
    tags(
        (name = "photogram", description = "Photo sharing API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container for every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    /// Built from `config.jwt_secret` at startup.
    pub verifier: VerifierState,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the state together, deriving the token verifier from the configured secret.
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        let verifier = std::sync::Arc::new(TokenVerifier::new(&config.jwt_secret));
        Self {
            repo,
            storage,
            verifier,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for VerifierState {
    fn from_ref(app_state: &AppState) -> VerifierState {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Runs the `AuthUser` extractor for every route in the authenticated router.
/// A missing or invalid token is rejected with 401 before any handler runs; a
/// valid token is stored in the request extensions so handlers do not verify
/// it a second time.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// cors_layer
///
/// Allows the configured browser origin. An origin that is not a valid header
/// value falls back to allowing any origin.
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!(origin, "invalid CORS origin, allowing any");
            AllowOrigin::from(Any)
        }
    };

    CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(allow_origin)
}

/// create_router
///
/// Assembles routes, middleware and state.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    let x_request_id = HeaderName::from_static("x-request-id");

    let api = authenticated::authenticated_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), auth_middleware),
    );

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/api", api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, tagged with its `x-request-id` so every log line of
/// the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
