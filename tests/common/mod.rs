#![allow(dead_code)]

use blog_api::{
    AppConfig, AppState, MemoryRepository, RepositoryState,
    auth::AuthUser,
    models::{NewPost, NewUser, Post, User, UserType},
};
use std::sync::Arc;

pub const PASSWORD: &str = "correct-horse";

/// A fresh state over an empty in-memory store, plus a handle on the store itself.
pub fn memory_state() -> (AppState, Arc<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::new());
    let state = AppState::new(repo.clone() as RepositoryState, &AppConfig::default());
    (state, repo)
}

pub fn failing_state() -> AppState {
    let repo = Arc::new(MemoryRepository::new_failing()) as RepositoryState;
    AppState::new(repo, &AppConfig::default())
}

/// Inserts a user named `name` with email `{name}@example.com` and password `PASSWORD`.
pub async fn seed_user(state: &AppState, name: &str, user_type: UserType) -> User {
    let password_hash = state
        .credentials
        .hash_password(PASSWORD)
        .expect("hashing the seed password");
    state
        .repo
        .create_user(NewUser {
            user_type,
            name: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash,
        })
        .await
        .expect("seeding user")
}

pub async fn seed_post(state: &AppState, author: &User, title: &str) -> Post {
    state
        .repo
        .create_post(NewPost {
            title: title.to_string(),
            content: "Content long enough to pass validation.".to_string(),
            author_id: author.id,
        })
        .await
        .expect("seeding post")
}

pub fn token_for(state: &AppState, user: &User) -> String {
    state
        .credentials
        .issue_token(user.id)
        .expect("issuing token")
}

pub fn as_auth(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        user_type: user.user_type,
    }
}
