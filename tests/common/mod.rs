#![allow(dead_code)]

use jsonwebtoken::{EncodingKey, Header, encode};
use photogram::{
    AppConfig, AppState, InMemoryRepository, MockImageStore,
    auth::{AuthUser, Claims},
    models::{Identity, User},
    repository::RepositoryState,
    storage::StorageState,
};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn now() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Signs a token for `user_id` expiring `exp_offset` seconds from now
/// (negative for an already expired token).
pub fn token_signed_with(secret: &str, user_id: Uuid, exp_offset: i64) -> String {
    let now = now();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn token_for(user_id: Uuid) -> String {
    token_signed_with(TEST_JWT_SECRET, user_id, 3600)
}

pub fn bearer(user_id: Uuid) -> String {
    format!("Bearer {}", token_for(user_id))
}

pub fn user(name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        password: "$2b$10$hashedpasswordvalue".to_string(),
        profile_image: Some(format!("{}.png", name.to_lowercase())),
        bio: None,
    }
}

pub fn auth_user(user: &User) -> AuthUser {
    AuthUser {
        identity: Some(Identity::from(user.clone())),
    }
}

/// An in-memory repository seeded with the given users.
pub fn seeded_repo(users: &[&User]) -> Arc<InMemoryRepository> {
    let repo = Arc::new(InMemoryRepository::new());
    for user in users {
        repo.insert_user((*user).clone()).unwrap();
    }
    repo
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn state_with(repo: RepositoryState, storage: StorageState) -> AppState {
    AppState::new(repo, storage, test_config())
}

pub fn test_state(repo: Arc<InMemoryRepository>) -> AppState {
    state_with(repo, Arc::new(MockImageStore::new()))
}
