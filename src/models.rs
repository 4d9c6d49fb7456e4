use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::likes::LikeAction;

// --- Identity ---

/// User
///
/// The account record stored in the `users` table. Accounts are created by the
/// registration service; this backend only reads them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Password hash. Never leaves the persistence layer in a response.
    #[serde(skip_serializing, default)]
    pub password: String,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
}

/// Identity
///
/// The resolved caller attached to a request once the bearer token has been
/// verified. It is a `User` with the credential stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub profile_image: Option<String>,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            profile_image: user.profile_image,
        }
    }
}

// --- Photo Documents ---

/// Photo
///
/// A single uploaded image together with its social state. Likes and comments
/// live inside the document, so deleting the photo removes them as well.
///
/// `owner_name` is copied from the owner at creation time and is never
/// refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Photo {
    pub id: Uuid,
    /// Storage key of the uploaded image (see `POST /api/photos/upload`).
    pub image: String,
    pub title: String,
    pub owner_id: Uuid,
    pub owner_name: String,
    /// User ids that currently like the photo. Never holds duplicates.
    pub likes: Vec<Uuid>,
    /// Append-only, oldest first.
    pub comments: Vec<Comment>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A comment stored on a photo. Author name and image are snapshots taken
/// when the comment was posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Comment {
    pub text: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub author_image: Option<String>,
}

impl Comment {
    /// Builds a comment authored by `identity`, snapshotting its current name and image.
    pub fn by(identity: &Identity, text: String) -> Self {
        Self {
            text,
            author_id: identity.id,
            author_name: identity.name.clone(),
            author_image: identity.profile_image.clone(),
        }
    }
}

/// NewPhoto
///
/// The fields the store needs to create a photo document. Id and timestamps
/// are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub image: String,
    pub title: String,
    pub owner_id: Uuid,
    pub owner_name: String,
}

/// LikeOutcome
///
/// What the store reports after an atomic like toggle.
#[derive(Debug, Clone)]
pub struct LikeOutcome {
    pub photo: Photo,
    pub action: LikeAction,
}

// --- Request Payloads ---

/// CreatePhotoRequest
///
/// Input payload for `POST /api/photos`. `image` is the key returned by the
/// presigned upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePhotoRequest {
    pub image: String,
    #[serde(default)]
    pub title: String,
}

/// UpdatePhotoRequest
///
/// Only the title can change. A missing title leaves the current one in place.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePhotoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// CreateCommentRequest
///
/// The text is stored as sent. A missing field is an empty comment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[serde(default, alias = "comment")]
    pub text: String,
}

/// ImageUploadRequest
///
/// Input payload for requesting a presigned image upload URL. The object key's
/// extension is derived from the content type, never from a client filename.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ImageUploadRequest {
    #[schema(example = "image/jpeg")]
    pub content_type: String,
}

// --- Response Payloads ---

/// ImageUploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ImageUploadResponse {
    /// Time-limited URL for the client's PUT request.
    pub upload_url: String,
    /// Key to send back as `image` when creating the photo.
    pub image: String,
}

/// ImageUrlResponse
///
/// Result of `GET /api/photos/{id}/image`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ImageUrlResponse {
    /// Time-limited URL the client can GET the image file from.
    pub image_url: String,
}

/// PhotoDeleted
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PhotoDeleted {
    pub id: Uuid,
    pub message: String,
}

/// PhotoUpdated
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PhotoUpdated {
    pub photo: Photo,
    pub message: String,
}

/// LikeToggled
///
/// Result of `PUT /api/photos/like/{id}`. `likes` is the like set after the toggle.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LikeToggled {
    pub photo_id: Uuid,
    pub user_id: Uuid,
    pub action: LikeAction,
    pub likes: Vec<Uuid>,
    pub message: String,
}

/// CommentAdded
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentAdded {
    pub comment: Comment,
    pub message: String,
}
