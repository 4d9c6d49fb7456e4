use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every photo endpoint. The router is nested under `/api` and wrapped in the
/// auth middleware by `create_router`, so each request has passed the token
/// verifier before a handler runs. Handlers still reject an `AuthUser` whose
/// identity could not be resolved.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /photos/upload
        // Presigned PUT URL for uploading the image file to object storage.
        .route("/photos/upload", post(handlers::presign_image_upload))
        // GET/POST /photos
        .route(
            "/photos",
            get(handlers::get_photos).post(handlers::create_photo),
        )
        // GET /photos/search?q=
        // Case-insensitive title search.
        .route("/photos/search", get(handlers::search_photos))
        // GET /photos/user/{id}
        .route("/photos/user/{id}", get(handlers::get_user_photos))
        // GET/PUT/DELETE /photos/{id}
        // Update and delete are owner-only; the guard runs inside the handlers.
        .route(
            "/photos/{id}",
            get(handlers::get_photo)
                .put(handlers::update_photo)
                .delete(handlers::delete_photo),
        )
        // GET /photos/{id}/image
        // Presigned download URL for the stored image file.
        .route("/photos/{id}/image", get(handlers::get_photo_image))
        // PUT /photos/like/{id}
        // Toggle: a second call removes the like again.
        .route("/photos/like/{id}", put(handlers::like_photo))
        // PUT /photos/comment/{id}
        .route("/photos/comment/{id}", put(handlers::comment_photo))
}
