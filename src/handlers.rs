use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    extract::ApiJson,
    guard::{self, Action},
    models::{
        Comment, CommentAdded, CreateCommentRequest, CreatePhotoRequest, ImageUploadRequest,
        ImageUploadResponse, ImageUrlResponse, LikeToggled, NewPhoto, Photo, PhotoDeleted,
        PhotoUpdated, UpdatePhotoRequest,
    },
    storage,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Helpers ---

/// parse_photo_id
///
/// A path id that is not a UUID cannot name a photo, so it is reported exactly
/// like a missing one.
fn parse_photo_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::PHOTO_NOT_FOUND)
}

/// load_photo
async fn load_photo(state: &AppState, id: Uuid) -> Result<Photo, ApiError> {
    state
        .repo
        .find_photo(id)
        .await?
        .ok_or(ApiError::PHOTO_NOT_FOUND)
}

// --- Query Structs ---

/// SearchQuery
///
/// `q` is matched case-insensitively against photo titles. An empty or missing
/// query matches every photo.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

// --- Photo Lifecycle ---

/// create_photo
///
/// Stores a new photo owned by the caller. The caller's current name is copied
/// onto the photo and never refreshed afterwards. `image` must be a key issued
/// by the upload endpoint.
#[utoipa::path(
    post,
    path = "/api/photos",
    request_body = CreatePhotoRequest,
    responses(
        (status = 201, description = "Created", body = Photo),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Invalid image key, or store produced no document")
    )
)]
pub async fn create_photo(
    AuthUser { identity }: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreatePhotoRequest>,
) -> Result<(StatusCode, Json<Photo>), ApiError> {
    let owner = guard::authenticated(identity.as_ref())?;

    if !storage::is_upload_key(&payload.image) {
        tracing::warn!(owner_id = %owner.id, image = %payload.image, "rejected image key");
        return Err(ApiError::ValidationFailed("Invalid image key."));
    }

    let new_photo = NewPhoto {
        image: payload.image,
        title: payload.title,
        owner_id: owner.id,
        owner_name: owner.name.clone(),
    };

    let photo = state
        .repo
        .create_photo(new_photo)
        .await?
        .ok_or(ApiError::ValidationFailed(
            "There was a problem, please try again later.",
        ))?;

    tracing::info!(photo_id = %photo.id, owner_id = %photo.owner_id, "photo created");
    Ok((StatusCode::CREATED, Json(photo)))
}

/// delete_photo
///
/// Owner-only. The photo is loaded first so a missing photo (404) is told
/// apart from someone else's photo (422).
#[utoipa::path(
    delete,
    path = "/api/photos/{id}",
    params(("id" = String, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Deleted", body = PhotoDeleted),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Not Owner")
    )
)]
pub async fn delete_photo(
    AuthUser { identity }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PhotoDeleted>, ApiError> {
    let id = parse_photo_id(&id)?;
    let photo = load_photo(&state, id).await?;

    if let Err(denial) = guard::authorize(&photo, identity.as_ref(), Action::Delete) {
        tracing::warn!(photo_id = %photo.id, "delete denied: {}", denial);
        return Err(denial.into());
    }

    // The photo may have been removed between the load and this call.
    if !state.repo.delete_photo(photo.id).await? {
        return Err(ApiError::PHOTO_NOT_FOUND);
    }

    tracing::info!(photo_id = %photo.id, "photo deleted");
    Ok(Json(PhotoDeleted {
        id: photo.id,
        message: "Photo deleted successfully.".to_string(),
    }))
}

/// update_photo
///
/// Owner-only title change. A request without a title leaves the photo as is.
#[utoipa::path(
    put,
    path = "/api/photos/{id}",
    params(("id" = String, Path, description = "Photo ID")),
    request_body = UpdatePhotoRequest,
    responses(
        (status = 200, description = "Updated", body = PhotoUpdated),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Not Owner")
    )
)]
pub async fn update_photo(
    AuthUser { identity }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdatePhotoRequest>,
) -> Result<Json<PhotoUpdated>, ApiError> {
    let id = parse_photo_id(&id)?;
    let photo = load_photo(&state, id).await?;

    if let Err(denial) = guard::authorize(&photo, identity.as_ref(), Action::Update) {
        tracing::warn!(photo_id = %photo.id, "update denied: {}", denial);
        return Err(denial.into());
    }

    let photo = state
        .repo
        .update_title(photo.id, payload.title)
        .await?
        .ok_or(ApiError::PHOTO_NOT_FOUND)?;

    Ok(Json(PhotoUpdated {
        photo,
        message: "Photo updated successfully.".to_string(),
    }))
}

// --- Retrieval ---

/// get_photos
///
/// Every photo, newest first.
#[utoipa::path(
    get,
    path = "/api/photos",
    responses((status = 200, description = "All photos", body = [Photo]))
)]
pub async fn get_photos(
    AuthUser { identity }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Photo>>, ApiError> {
    guard::authenticated(identity.as_ref())?;
    Ok(Json(state.repo.list_photos().await?))
}

/// get_user_photos
///
/// Photos owned by one user, newest first. An id that is not a UUID owns nothing.
#[utoipa::path(
    get,
    path = "/api/photos/user/{id}",
    params(("id" = String, Path, description = "Owner ID")),
    responses((status = 200, description = "User photos", body = [Photo]))
)]
pub async fn get_user_photos(
    AuthUser { identity }: AuthUser,
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<Vec<Photo>>, ApiError> {
    guard::authenticated(identity.as_ref())?;

    let Ok(owner_id) = Uuid::parse_str(&owner_id) else {
        return Ok(Json(vec![]));
    };
    Ok(Json(state.repo.list_photos_by_owner(owner_id).await?))
}

/// get_photo
#[utoipa::path(
    get,
    path = "/api/photos/{id}",
    params(("id" = String, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Found", body = Photo),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_photo(
    AuthUser { identity }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Photo>, ApiError> {
    guard::authenticated(identity.as_ref())?;
    let id = parse_photo_id(&id)?;
    let photo = load_photo(&state, id).await?;
    guard::authorize(&photo, identity.as_ref(), Action::Read)?;
    Ok(Json(photo))
}

/// get_photo_image
///
/// Short-lived download URL for the photo's image file.
#[utoipa::path(
    get,
    path = "/api/photos/{id}/image",
    params(("id" = String, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "URL", body = ImageUrlResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_photo_image(
    AuthUser { identity }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ImageUrlResponse>, ApiError> {
    guard::authenticated(identity.as_ref())?;
    let id = parse_photo_id(&id)?;
    let photo = load_photo(&state, id).await?;
    guard::authorize(&photo, identity.as_ref(), Action::Read)?;

    let image_url = state.storage.presign_download(&photo.image).await?;
    Ok(Json(ImageUrlResponse { image_url }))
}

/// search_photos
#[utoipa::path(
    get,
    path = "/api/photos/search",
    params(SearchQuery),
    responses((status = 200, description = "Matching photos", body = [Photo]))
)]
pub async fn search_photos(
    AuthUser { identity }: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Photo>>, ApiError> {
    guard::authenticated(identity.as_ref())?;
    Ok(Json(state.repo.search_photos(query.q.trim()).await?))
}

// --- Social Actions ---

/// like_photo
///
/// Flips the caller's like. The store applies the toggle atomically, so the
/// photo is not loaded beforehand; a missing photo surfaces as `None`.
#[utoipa::path(
    put,
    path = "/api/photos/like/{id}",
    params(("id" = String, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Toggled", body = LikeToggled),
        (status = 404, description = "Not Found")
    )
)]
pub async fn like_photo(
    AuthUser { identity }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LikeToggled>, ApiError> {
    let user = guard::authenticated(identity.as_ref())?;
    let id = parse_photo_id(&id)?;

    let outcome = state
        .repo
        .toggle_like(id, user.id)
        .await?
        .ok_or(ApiError::PHOTO_NOT_FOUND)?;

    tracing::debug!(photo_id = %id, user_id = %user.id, action = ?outcome.action, "like toggled");
    Ok(Json(LikeToggled {
        photo_id: outcome.photo.id,
        user_id: user.id,
        action: outcome.action,
        likes: outcome.photo.likes,
        message: outcome.action.message().to_string(),
    }))
}

/// comment_photo
///
/// Appends a comment carrying a snapshot of the caller's name and image. The
/// text is stored as given.
#[utoipa::path(
    put,
    path = "/api/photos/comment/{id}",
    params(("id" = String, Path, description = "Photo ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment Added", body = CommentAdded),
        (status = 404, description = "Not Found")
    )
)]
pub async fn comment_photo(
    AuthUser { identity }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<CreateCommentRequest>,
) -> Result<Json<CommentAdded>, ApiError> {
    let author = guard::authenticated(identity.as_ref())?;
    let id = parse_photo_id(&id)?;

    let comment = Comment::by(author, payload.text);
    state
        .repo
        .push_comment(id, comment.clone())
        .await?
        .ok_or(ApiError::PHOTO_NOT_FOUND)?;

    Ok(Json(CommentAdded {
        comment,
        message: "Comment added successfully.".to_string(),
    }))
}

// --- Uploads ---

/// presign_image_upload
///
/// Issues a short-lived URL the client uses to PUT the image straight into
/// object storage. The returned `image` key is what `create_photo` expects.
#[utoipa::path(
    post,
    path = "/api/photos/upload",
    request_body = ImageUploadRequest,
    responses(
        (status = 200, description = "URL", body = ImageUploadResponse),
        (status = 422, description = "Unsupported image type")
    )
)]
pub async fn presign_image_upload(
    AuthUser { identity }: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ImageUploadRequest>,
) -> Result<Json<ImageUploadResponse>, ApiError> {
    guard::authenticated(identity.as_ref())?;

    let extension = storage::image_extension(&payload.content_type)?;
    let image = storage::upload_key(extension);

    let upload_url = state
        .storage
        .presign_upload(&image, &payload.content_type)
        .await?;

    Ok(Json(ImageUploadResponse { upload_url, image }))
}
