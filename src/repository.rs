use crate::likes::{self, LikeAction};
use crate::models::{Comment, LikeOutcome, NewPhoto, Photo, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// StoreError
///
/// Any failure raised by the persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store is unavailable: {0}")]
    Unavailable(String),
}

/// Repository Trait
///
/// The document-store contract the photo operations run against. Handlers
/// only ever see this trait, so the Postgres store and the in-memory store
/// are interchangeable.
///
/// `toggle_like` and `push_comment` must be applied as one atomic update per
/// photo; concurrent likes from different users may not overwrite each other.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    // --- Photo Retrieval ---
    async fn find_photo(&self, id: Uuid) -> Result<Option<Photo>, StoreError>;
    // Newest first.
    async fn list_photos(&self) -> Result<Vec<Photo>, StoreError>;
    // Newest first.
    async fn list_photos_by_owner(&self, owner_id: Uuid) -> Result<Vec<Photo>, StoreError>;
    // Case-insensitive substring match on the title.
    async fn search_photos(&self, query: &str) -> Result<Vec<Photo>, StoreError>;

    // --- Photo Lifecycle ---
    // `None` means the store produced no document.
    async fn create_photo(&self, photo: NewPhoto) -> Result<Option<Photo>, StoreError>;
    // `None` title keeps the current one. `None` result means no such photo.
    async fn update_title(&self, id: Uuid, title: Option<String>) -> Result<Option<Photo>, StoreError>;
    // Returns false when nothing was deleted.
    async fn delete_photo(&self, id: Uuid) -> Result<bool, StoreError>;

    // --- Social Actions ---
    async fn toggle_like(&self, photo_id: Uuid, user_id: Uuid) -> Result<Option<LikeOutcome>, StoreError>;
    async fn push_comment(&self, photo_id: Uuid, comment: Comment) -> Result<Option<Photo>, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// 1. Postgres

/// PhotoRecord
///
/// Raw `photos` row. Comments are stored as a JSONB array and converted into
/// the `Photo` document before leaving the repository.
#[derive(Debug, FromRow)]
struct PhotoRecord {
    id: Uuid,
    image: String,
    title: String,
    owner_id: Uuid,
    owner_name: String,
    likes: Vec<Uuid>,
    comments: Json<Vec<Comment>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PhotoRecord> for Photo {
    fn from(record: PhotoRecord) -> Self {
        Photo {
            id: record.id,
            image: record.image,
            title: record.title,
            owner_id: record.owner_id,
            owner_name: record.owner_name,
            likes: record.likes,
            comments: record.comments.0,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

const PHOTO_COLUMNS: &str =
    "id, image, title, owner_id, owner_name, likes, comments, created_at, updated_at";

/// like_pattern
///
/// Turns free text into an `ILIKE` substring pattern, escaping the LIKE
/// wildcards so they match literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// PostgresRepository
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// find_user
    ///
    /// The password column is selected here so the full `User` is available;
    /// it is dropped when the verifier converts to `Identity`.
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password, profile_image, bio FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_photo(&self, id: Uuid) -> Result<Option<Photo>, StoreError> {
        let query = format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1");
        let record = sqlx::query_as::<_, PhotoRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record.map(Photo::from))
    }

    async fn list_photos(&self) -> Result<Vec<Photo>, StoreError> {
        let query = format!("SELECT {PHOTO_COLUMNS} FROM photos ORDER BY created_at DESC");
        let records = sqlx::query_as::<_, PhotoRecord>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(records.into_iter().map(Photo::from).collect())
    }

    async fn list_photos_by_owner(&self, owner_id: Uuid) -> Result<Vec<Photo>, StoreError> {
        let query = format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE owner_id = $1 ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, PhotoRecord>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(records.into_iter().map(Photo::from).collect())
    }

    async fn search_photos(&self, query: &str) -> Result<Vec<Photo>, StoreError> {
        let sql = format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE title ILIKE $1 ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, PhotoRecord>(&sql)
            .bind(like_pattern(query))
            .fetch_all(&self.pool)
            .await?;
        Ok(records.into_iter().map(Photo::from).collect())
    }

    async fn create_photo(&self, photo: NewPhoto) -> Result<Option<Photo>, StoreError> {
        let query = format!(
            "INSERT INTO photos (id, image, title, owner_id, owner_name) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PHOTO_COLUMNS}"
        );
        let record = sqlx::query_as::<_, PhotoRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(photo.image)
            .bind(photo.title)
            .bind(photo.owner_id)
            .bind(photo.owner_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record.map(Photo::from))
    }

    /// update_title
    ///
    /// `COALESCE` keeps the stored title when no new one is given.
    async fn update_title(&self, id: Uuid, title: Option<String>) -> Result<Option<Photo>, StoreError> {
        let query = format!(
            "UPDATE photos SET title = COALESCE($2, title), updated_at = NOW() \
             WHERE id = $1 RETURNING {PHOTO_COLUMNS}"
        );
        let record = sqlx::query_as::<_, PhotoRecord>(&query)
            .bind(id)
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record.map(Photo::from))
    }

    async fn delete_photo(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM photos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// toggle_like
    ///
    /// One `UPDATE` decides and applies the transition under the row lock, so
    /// concurrent toggles on the same photo cannot lose each other's writes.
    /// The action is read back from the resulting like set.
    async fn toggle_like(&self, photo_id: Uuid, user_id: Uuid) -> Result<Option<LikeOutcome>, StoreError> {
        let query = format!(
            "UPDATE photos SET \
                likes = CASE WHEN $2 = ANY(likes) THEN array_remove(likes, $2) \
                             ELSE array_append(likes, $2) END, \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {PHOTO_COLUMNS}"
        );
        let record = sqlx::query_as::<_, PhotoRecord>(&query)
            .bind(photo_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(|record| {
            let photo = Photo::from(record);
            let action = if photo.likes.contains(&user_id) {
                LikeAction::Liked
            } else {
                LikeAction::Unliked
            };
            LikeOutcome { photo, action }
        }))
    }

    /// push_comment
    ///
    /// Appends to the JSONB array in place.
    async fn push_comment(&self, photo_id: Uuid, comment: Comment) -> Result<Option<Photo>, StoreError> {
        let query = format!(
            "UPDATE photos SET comments = comments || jsonb_build_array($2::jsonb), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {PHOTO_COLUMNS}"
        );
        let record = sqlx::query_as::<_, PhotoRecord>(&query)
            .bind(photo_id)
            .bind(Json(comment))
            .fetch_optional(&self.pool)
            .await?;
        Ok(record.map(Photo::from))
    }
}

// 2. In-Memory

/// InMemoryRepository
///
/// A process-local store used by tests and local demos. Every operation takes
/// the lock, works synchronously and releases it before returning, so no lock
/// is held across an `.await`. Photos are kept in insertion order.
#[derive(Default)]
pub struct InMemoryRepository {
    users: Mutex<Vec<User>>,
    photos: Mutex<Vec<Photo>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user so tokens for it resolve to an identity.
    pub fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut users = lock(&self.users)?;
        users.retain(|existing| existing.id != user.id);
        users.push(user);
        Ok(())
    }

    /// Drops a user, leaving their photos and comments untouched.
    pub fn remove_user(&self, id: Uuid) -> Result<(), StoreError> {
        lock(&self.users)?.retain(|user| user.id != id);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
}

fn newest_first<'a>(photos: impl DoubleEndedIterator<Item = &'a Photo>) -> Vec<Photo> {
    photos.rev().cloned().collect()
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users)?.iter().find(|user| user.id == id).cloned())
    }

    async fn find_photo(&self, id: Uuid) -> Result<Option<Photo>, StoreError> {
        Ok(lock(&self.photos)?.iter().find(|photo| photo.id == id).cloned())
    }

    async fn list_photos(&self) -> Result<Vec<Photo>, StoreError> {
        Ok(newest_first(lock(&self.photos)?.iter()))
    }

    async fn list_photos_by_owner(&self, owner_id: Uuid) -> Result<Vec<Photo>, StoreError> {
        let photos = lock(&self.photos)?;
        Ok(newest_first(
            photos.iter().filter(|photo| photo.owner_id == owner_id),
        ))
    }

    async fn search_photos(&self, query: &str) -> Result<Vec<Photo>, StoreError> {
        let needle = query.to_lowercase();
        let photos = lock(&self.photos)?;
        Ok(newest_first(
            photos
                .iter()
                .filter(|photo| photo.title.to_lowercase().contains(&needle)),
        ))
    }

    async fn create_photo(&self, photo: NewPhoto) -> Result<Option<Photo>, StoreError> {
        let now = Utc::now();
        let created = Photo {
            id: Uuid::new_v4(),
            image: photo.image,
            title: photo.title,
            owner_id: photo.owner_id,
            owner_name: photo.owner_name,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        lock(&self.photos)?.push(created.clone());
        Ok(Some(created))
    }

    async fn update_title(&self, id: Uuid, title: Option<String>) -> Result<Option<Photo>, StoreError> {
        let mut photos = lock(&self.photos)?;
        Ok(photos.iter_mut().find(|photo| photo.id == id).map(|photo| {
            if let Some(title) = title {
                photo.title = title;
            }
            photo.updated_at = Utc::now();
            photo.clone()
        }))
    }

    async fn delete_photo(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut photos = lock(&self.photos)?;
        let before = photos.len();
        photos.retain(|photo| photo.id != id);
        Ok(photos.len() < before)
    }

    async fn toggle_like(&self, photo_id: Uuid, user_id: Uuid) -> Result<Option<LikeOutcome>, StoreError> {
        let mut photos = lock(&self.photos)?;
        Ok(photos
            .iter_mut()
            .find(|photo| photo.id == photo_id)
            .map(|photo| {
                let action = likes::toggle(&mut photo.likes, user_id);
                photo.updated_at = Utc::now();
                LikeOutcome {
                    photo: photo.clone(),
                    action,
                }
            }))
    }

    async fn push_comment(&self, photo_id: Uuid, comment: Comment) -> Result<Option<Photo>, StoreError> {
        let mut photos = lock(&self.photos)?;
        Ok(photos.iter_mut().find(|photo| photo.id == photo_id).map(|photo| {
            photo.comments.push(comment);
            photo.updated_at = Utc::now();
            photo.clone()
        }))
    }
}
