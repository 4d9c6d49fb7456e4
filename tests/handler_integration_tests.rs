mod common;

use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::{auth_user, seeded_repo, state_with, test_state, user};
use photogram::{
    ApiError, InMemoryRepository, MockImageStore,
    auth::AuthUser,
    extract::ApiJson,
    handlers::{self, SearchQuery},
    likes::LikeAction,
    models::{
        Comment, CreateCommentRequest, CreatePhotoRequest, LikeOutcome, NewPhoto, Photo,
        UpdatePhotoRequest, User,
    },
    repository::{Repository, StoreError},
    storage,
};
use std::sync::Arc;
use uuid::Uuid;

// --- Mock Repository ---

/// Wraps the in-memory store and lets a test force the edge cases a real
/// database produces: a create that returns nothing, a delete that loses the
/// race, and outright failures.
#[derive(Default)]
struct MockRepoControl {
    inner: InMemoryRepository,
    create_returns_nothing: bool,
    delete_finds_nothing: bool,
    fail_listing: bool,
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.inner.find_user(id).await
    }
    async fn find_photo(&self, id: Uuid) -> Result<Option<Photo>, StoreError> {
        self.inner.find_photo(id).await
    }
    async fn list_photos(&self) -> Result<Vec<Photo>, StoreError> {
        if self.fail_listing {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.list_photos().await
    }
    async fn list_photos_by_owner(&self, owner_id: Uuid) -> Result<Vec<Photo>, StoreError> {
        self.inner.list_photos_by_owner(owner_id).await
    }
    async fn search_photos(&self, query: &str) -> Result<Vec<Photo>, StoreError> {
        self.inner.search_photos(query).await
    }
    async fn create_photo(&self, photo: NewPhoto) -> Result<Option<Photo>, StoreError> {
        if self.create_returns_nothing {
            return Ok(None);
        }
        self.inner.create_photo(photo).await
    }
    async fn update_title(&self, id: Uuid, title: Option<String>) -> Result<Option<Photo>, StoreError> {
        self.inner.update_title(id, title).await
    }
    async fn delete_photo(&self, id: Uuid) -> Result<bool, StoreError> {
        if self.delete_finds_nothing {
            return Ok(false);
        }
        self.inner.delete_photo(id).await
    }
    async fn toggle_like(&self, photo_id: Uuid, user_id: Uuid) -> Result<Option<LikeOutcome>, StoreError> {
        self.inner.toggle_like(photo_id, user_id).await
    }
    async fn push_comment(&self, photo_id: Uuid, comment: Comment) -> Result<Option<Photo>, StoreError> {
        self.inner.push_comment(photo_id, comment).await
    }
}

// --- Test Utilities ---

fn anonymous() -> AuthUser {
    AuthUser { identity: None }
}

async fn seed_photo(repo: &dyn Repository, owner: &User, title: &str) -> Photo {
    repo.create_photo(NewPhoto {
        image: format!("photos/{}.jpg", Uuid::new_v4()),
        title: title.to_string(),
        owner_id: owner.id,
        owner_name: owner.name.clone(),
    })
    .await
    .unwrap()
    .unwrap()
}

fn create_request(title: &str) -> ApiJson<CreatePhotoRequest> {
    create_request_with_image(&storage::upload_key("jpg"), title)
}

fn create_request_with_image(image: &str, title: &str) -> ApiJson<CreatePhotoRequest> {
    ApiJson(CreatePhotoRequest {
        image: image.to_string(),
        title: title.to_string(),
    })
}

// --- Create ---

#[tokio::test]
async fn test_create_photo_snapshots_owner() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let state = test_state(repo.clone());

    let (status, Json(photo)) =
        handlers::create_photo(auth_user(&alice), State(state), create_request("sunset"))
            .await
            .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(photo.owner_id, alice.id);
    assert_eq!(photo.owner_name, "Alice");
    assert_eq!(photo.title, "sunset");
    assert!(storage::is_upload_key(&photo.image));
    assert!(photo.likes.is_empty());
    assert!(photo.comments.is_empty());

    let stored = repo.find_photo(photo.id).await.unwrap();
    assert_eq!(stored, Some(photo));
}

#[tokio::test]
async fn test_create_photo_without_identity_is_unauthenticated() {
    let state = test_state(seeded_repo(&[]));

    let result = handlers::create_photo(anonymous(), State(state), create_request("sunset")).await;

    let err = result.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_photo_store_returns_nothing() {
    let alice = user("Alice");
    let repo = MockRepoControl {
        create_returns_nothing: true,
        ..MockRepoControl::default()
    };
    let state = state_with(Arc::new(repo), Arc::new(MockImageStore::new()));

    let result = handlers::create_photo(auth_user(&alice), State(state), create_request("x")).await;

    let err = result.unwrap_err();
    assert!(matches!(err, ApiError::ValidationFailed(_)));
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_create_photo_rejects_foreign_image_keys() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let state = test_state(repo.clone());

    let rejected = vec![
        String::new(),
        "https://elsewhere.example.com/cat.jpg".to_string(),
        "photos/sunset.jpg".to_string(),
        "photos/../secrets.png".to_string(),
        format!("photos/{}.gif", Uuid::new_v4()),
        format!("uploads/{}.jpg", Uuid::new_v4()),
        format!("photos/{}.jpg", Uuid::new_v4().simple()),
    ];

    for image in rejected {
        let result = handlers::create_photo(
            auth_user(&alice),
            State(state.clone()),
            create_request_with_image(&image, "x"),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(_)), "image {:?}", image);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    assert!(repo.list_photos().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_photo_accepts_png_key() {
    let alice = user("Alice");
    let state = test_state(seeded_repo(&[&alice]));
    let image = format!("photos/{}.png", Uuid::new_v4());

    let (status, Json(photo)) = handlers::create_photo(
        auth_user(&alice),
        State(state),
        create_request_with_image(&image, "x"),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(photo.image, image);
}

// --- Update ---

#[tokio::test]
async fn test_update_title_by_owner() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo);

    let Json(updated) = handlers::update_photo(
        auth_user(&alice),
        State(state),
        Path(photo.id.to_string()),
        ApiJson(UpdatePhotoRequest {
            title: Some("sunrise".to_string()),
        }),
    )
    .await
    .unwrap();

    assert_eq!(updated.photo.title, "sunrise");
    assert_eq!(updated.photo.owner_id, alice.id);
}

#[tokio::test]
async fn test_update_without_title_keeps_current() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo);

    let Json(updated) = handlers::update_photo(
        auth_user(&alice),
        State(state),
        Path(photo.id.to_string()),
        ApiJson(UpdatePhotoRequest { title: None }),
    )
    .await
    .unwrap();

    assert_eq!(updated.photo.title, "sunset");
}

#[tokio::test]
async fn test_update_by_non_owner_is_denied_and_unchanged() {
    let alice = user("Alice");
    let bob = user("Bob");
    let repo = seeded_repo(&[&alice, &bob]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo.clone());

    let result = handlers::update_photo(
        auth_user(&bob),
        State(state),
        Path(photo.id.to_string()),
        ApiJson(UpdatePhotoRequest {
            title: Some("mine now".to_string()),
        }),
    )
    .await;

    let err = result.unwrap_err();
    assert!(matches!(err, ApiError::NotOwner));
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let stored = repo.find_photo(photo.id).await.unwrap().unwrap();
    assert_eq!(stored, photo);
}

#[tokio::test]
async fn test_update_missing_photo_is_not_found() {
    let alice = user("Alice");
    let state = test_state(seeded_repo(&[&alice]));

    let result = handlers::update_photo(
        auth_user(&alice),
        State(state),
        Path(Uuid::new_v4().to_string()),
        ApiJson(UpdatePhotoRequest::default()),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::NOT_FOUND);
}

// --- Delete ---

#[tokio::test]
async fn test_delete_by_owner() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo.clone());

    let Json(deleted) = handlers::delete_photo(
        auth_user(&alice),
        State(state),
        Path(photo.id.to_string()),
    )
    .await
    .unwrap();

    assert_eq!(deleted.id, photo.id);
    assert!(repo.find_photo(photo.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_by_non_owner_keeps_photo() {
    let alice = user("Alice");
    let bob = user("Bob");
    let repo = seeded_repo(&[&alice, &bob]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo.clone());

    let result =
        handlers::delete_photo(auth_user(&bob), State(state), Path(photo.id.to_string())).await;

    assert!(matches!(result.unwrap_err(), ApiError::NotOwner));
    assert!(repo.find_photo(photo.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_with_unresolved_identity_keeps_photo() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo.clone());

    let result = handlers::delete_photo(anonymous(), State(state), Path(photo.id.to_string())).await;

    assert!(result.is_err());
    assert!(repo.find_photo(photo.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_lost_race_is_not_found() {
    let alice = user("Alice");
    let repo = MockRepoControl {
        delete_finds_nothing: true,
        ..MockRepoControl::default()
    };
    let photo = seed_photo(&repo, &alice, "sunset").await;
    let state = state_with(Arc::new(repo), Arc::new(MockImageStore::new()));

    let result =
        handlers::delete_photo(auth_user(&alice), State(state), Path(photo.id.to_string())).await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::NOT_FOUND);
}

// --- Read ---

#[tokio::test]
async fn test_get_photo_malformed_id_is_not_found() {
    let alice = user("Alice");
    let state = test_state(seeded_repo(&[&alice]));

    let result =
        handlers::get_photo(auth_user(&alice), State(state), Path("not-a-uuid".to_string())).await;

    let err = result.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let response = err.into_response();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["errors"][0], "Photo not found.");
}

#[tokio::test]
async fn test_get_photo_requires_identity() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo);

    let result = handlers::get_photo(anonymous(), State(state), Path(photo.id.to_string())).await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_photo_without_identity_hides_existence() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo);

    let existing =
        handlers::get_photo(anonymous(), State(state.clone()), Path(photo.id.to_string())).await;
    let missing =
        handlers::get_photo(anonymous(), State(state.clone()), Path(Uuid::new_v4().to_string()))
            .await;
    let malformed =
        handlers::get_photo(anonymous(), State(state), Path("nope".to_string())).await;

    for result in [existing, missing, malformed] {
        assert_eq!(result.unwrap_err().status_code(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_get_photo_image_returns_download_url() {
    let alice = user("Alice");
    let bob = user("Bob");
    let repo = seeded_repo(&[&alice, &bob]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo);

    let Json(url) =
        handlers::get_photo_image(auth_user(&bob), State(state), Path(photo.id.to_string()))
            .await
            .unwrap();

    assert!(url.image_url.contains(&photo.image));
    assert!(url.image_url.contains("method=get"));
}

#[tokio::test]
async fn test_get_photo_image_failures() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;

    let missing = handlers::get_photo_image(
        auth_user(&alice),
        State(test_state(repo.clone())),
        Path(Uuid::new_v4().to_string()),
    )
    .await;
    assert_eq!(missing.unwrap_err().status_code(), StatusCode::NOT_FOUND);

    let anonymous_result = handlers::get_photo_image(
        anonymous(),
        State(test_state(repo.clone())),
        Path(photo.id.to_string()),
    )
    .await;
    assert_eq!(
        anonymous_result.unwrap_err().status_code(),
        StatusCode::UNAUTHORIZED
    );

    let broken_storage = state_with(repo, Arc::new(MockImageStore::failing()));
    let failed = handlers::get_photo_image(
        auth_user(&alice),
        State(broken_storage),
        Path(photo.id.to_string()),
    )
    .await;
    assert_eq!(
        failed.unwrap_err().status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_listings_are_newest_first_and_filtered_by_owner() {
    let alice = user("Alice");
    let bob = user("Bob");
    let repo = seeded_repo(&[&alice, &bob]);
    let first = seed_photo(&*repo, &alice, "first").await;
    let second = seed_photo(&*repo, &bob, "second").await;
    let third = seed_photo(&*repo, &alice, "third").await;
    let state = test_state(repo);

    let Json(all) = handlers::get_photos(auth_user(&bob), State(state.clone()))
        .await
        .unwrap();
    let ids: Vec<Uuid> = all.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);

    let Json(alices) = handlers::get_user_photos(
        auth_user(&bob),
        State(state.clone()),
        Path(alice.id.to_string()),
    )
    .await
    .unwrap();
    let ids: Vec<Uuid> = alices.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![third.id, first.id]);

    let Json(nobody) =
        handlers::get_user_photos(auth_user(&bob), State(state), Path("garbage".to_string()))
            .await
            .unwrap();
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn test_listing_store_failure_is_server_error() {
    let alice = user("Alice");
    let repo = MockRepoControl {
        fail_listing: true,
        ..MockRepoControl::default()
    };
    let state = state_with(Arc::new(repo), Arc::new(MockImageStore::new()));

    let result = handlers::get_photos(auth_user(&alice), State(state)).await;

    assert_eq!(
        result.unwrap_err().status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_search_is_case_insensitive() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let sunset = seed_photo(&*repo, &alice, "Sunset at the pier").await;
    seed_photo(&*repo, &alice, "Morning fog").await;
    let state = test_state(repo);

    for q in ["sun", "SUN", "  Sun "] {
        let Json(found) = handlers::search_photos(
            auth_user(&alice),
            State(state.clone()),
            Query(SearchQuery { q: q.to_string() }),
        )
        .await
        .unwrap();
        let ids: Vec<Uuid> = found.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![sunset.id], "query {:?}", q);
    }

    let Json(everything) = handlers::search_photos(
        auth_user(&alice),
        State(state),
        Query(SearchQuery { q: String::new() }),
    )
    .await
    .unwrap();
    assert_eq!(everything.len(), 2);
}

// --- Likes ---

#[tokio::test]
async fn test_like_toggles_back_and_forth() {
    let alice = user("Alice");
    let bob = user("Bob");
    let repo = seeded_repo(&[&alice, &bob]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo);

    let Json(first) =
        handlers::like_photo(auth_user(&bob), State(state.clone()), Path(photo.id.to_string()))
            .await
            .unwrap();
    assert_eq!(first.action, LikeAction::Liked);
    assert_eq!(first.likes, vec![bob.id]);
    assert_eq!(first.photo_id, photo.id);
    assert_eq!(first.user_id, bob.id);

    let Json(second) =
        handlers::like_photo(auth_user(&bob), State(state), Path(photo.id.to_string()))
            .await
            .unwrap();
    assert_eq!(second.action, LikeAction::Unliked);
    assert!(second.likes.is_empty());
}

#[tokio::test]
async fn test_owner_may_like_own_photo() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let photo = seed_photo(&*repo, &alice, "selfie").await;
    let state = test_state(repo);

    let Json(liked) =
        handlers::like_photo(auth_user(&alice), State(state), Path(photo.id.to_string()))
            .await
            .unwrap();

    assert_eq!(liked.action, LikeAction::Liked);
}

#[tokio::test]
async fn test_like_missing_photo_is_not_found() {
    let bob = user("Bob");
    let state = test_state(seeded_repo(&[&bob]));

    let result =
        handlers::like_photo(auth_user(&bob), State(state), Path(Uuid::new_v4().to_string())).await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_like_without_identity_is_unauthenticated() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo.clone());

    let result = handlers::like_photo(anonymous(), State(state), Path(photo.id.to_string())).await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::UNAUTHORIZED);
    assert!(repo.find_photo(photo.id).await.unwrap().unwrap().likes.is_empty());
}

// --- Comments ---

#[tokio::test]
async fn test_comments_append_in_order_and_keep_history() {
    let alice = user("Alice");
    let bob = user("Bob");
    let repo = seeded_repo(&[&alice, &bob]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo.clone());

    let mut history: Vec<Comment> = vec![];
    for (author, text) in [(&bob, "wow"), (&alice, "thanks!"), (&bob, "wow")] {
        let Json(added) = handlers::comment_photo(
            auth_user(author),
            State(state.clone()),
            Path(photo.id.to_string()),
            ApiJson(CreateCommentRequest {
                text: text.to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(added.comment.text, text);
        assert_eq!(added.comment.author_id, author.id);

        let stored = repo.find_photo(photo.id).await.unwrap().unwrap();
        assert_eq!(stored.comments.len(), history.len() + 1);
        assert_eq!(&stored.comments[..history.len()], &history[..]);
        history.push(added.comment);
    }
}

#[tokio::test]
async fn test_comment_author_snapshot_is_not_retroactive() {
    let mut bob = user("Bob");
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice, &bob]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo.clone());

    handlers::comment_photo(
        auth_user(&bob),
        State(state),
        Path(photo.id.to_string()),
        ApiJson(CreateCommentRequest {
            text: "nice".to_string(),
        }),
    )
    .await
    .unwrap();

    bob.name = "Robert".to_string();
    bob.profile_image = Some("robert.png".to_string());
    repo.insert_user(bob.clone()).unwrap();

    let stored = repo.find_photo(photo.id).await.unwrap().unwrap();
    assert_eq!(stored.comments[0].author_name, "Bob");
    assert_eq!(stored.comments[0].author_image.as_deref(), Some("bob.png"));
}

#[tokio::test]
async fn test_comment_on_missing_photo_is_not_found() {
    let bob = user("Bob");
    let state = test_state(seeded_repo(&[&bob]));

    let result = handlers::comment_photo(
        auth_user(&bob),
        State(state),
        Path(Uuid::new_v4().to_string()),
        ApiJson(CreateCommentRequest {
            text: "hello?".to_string(),
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_comment_is_passed_through() {
    let alice = user("Alice");
    let repo = seeded_repo(&[&alice]);
    let photo = seed_photo(&*repo, &alice, "sunset").await;
    let state = test_state(repo);

    let Json(added) = handlers::comment_photo(
        auth_user(&alice),
        State(state),
        Path(photo.id.to_string()),
        ApiJson(CreateCommentRequest::default()),
    )
    .await
    .unwrap();

    assert_eq!(added.comment.text, "");
}
