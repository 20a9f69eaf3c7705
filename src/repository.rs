use std::{fmt, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{NewPost, NewUser, Post, PostChanges, User, UserCredentials, UserType};

/// Which unique column an insert collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Name,
    Email,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Email => f.write_str("email"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} already used")]
    Duplicate(UniqueField),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// Abstract contract for reading and writing the Users and Posts collections.
/// Handlers and the auth chain only ever see `RepositoryState`, so the backing store
/// (Postgres in production, memory in tests) is chosen once at startup.
///
/// Every failure is returned to the caller; nothing is retried or swallowed here.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    /// Login lookup; only the id and hash are read.
    async fn find_user_credentials_by_email(&self, email: &str)
    -> RepoResult<Option<UserCredentials>>;
    /// Returns a user whose name or email matches. A name match is preferred.
    async fn find_user_by_name_or_email(&self, name: &str, email: &str)
    -> RepoResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn list_users(&self, include_admins: bool) -> RepoResult<Vec<User>>;

    // --- Posts ---
    async fn list_visible_posts(&self) -> RepoResult<Vec<Post>>;
    async fn list_posts_by_author(&self, author_id: Uuid) -> RepoResult<Vec<Post>>;
    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>>;
    async fn create_post(&self, post: NewPost) -> RepoResult<Post>;
    /// Owner-scoped full update. `false` when no row matched `(id, author_id)`.
    async fn update_post(&self, id: Uuid, author_id: Uuid, changes: PostChanges)
    -> RepoResult<bool>;
    /// Owner-scoped flip of `is_hidden`. `false` when no row matched `(id, author_id)`.
    async fn toggle_post_hidden(&self, id: Uuid, author_id: Uuid) -> RepoResult<bool>;
    async fn delete_post(&self, id: Uuid) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres ---

const USER_COLUMNS: &str = r#"id, name, email, password_hash, "type""#;
const POST_COLUMNS: &str = "id, title, content, author_id, is_hidden, created_at, updated_at";

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            UUID PRIMARY KEY,
        name          TEXT NOT NULL CONSTRAINT users_name_key UNIQUE,
        email         TEXT NOT NULL CONSTRAINT users_email_key UNIQUE,
        password_hash TEXT NOT NULL,
        "type"        TEXT NOT NULL CHECK ("type" IN ('admin', 'blogger')),
        created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id         UUID PRIMARY KEY,
        title      TEXT NOT NULL,
        content    TEXT NOT NULL,
        author_id  UUID NOT NULL REFERENCES users (id),
        is_hidden  BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS posts_author_id_idx ON posts (author_id)",
];

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ensure_schema
    ///
    /// Creates both tables if they are absent. Safe to run on every startup.
    pub async fn ensure_schema(&self) -> RepoResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("database schema ensured");
        Ok(())
    }
}

/// Maps a unique-constraint violation on insert to the column that collided.
fn map_unique_violation(error: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            match db.constraint() {
                Some("users_name_key") => return RepositoryError::Duplicate(UniqueField::Name),
                Some("users_email_key") => return RepositoryError::Duplicate(UniqueField::Email),
                _ => {}
            }
        }
    }
    RepositoryError::Database(error)
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_credentials_by_email(
        &self,
        email: &str,
    ) -> RepoResult<Option<UserCredentials>> {
        Ok(sqlx::query_as::<_, UserCredentials>(
            "SELECT id, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// find_user_by_name_or_email
    ///
    /// One query for both columns. Ordering by the name match makes the result
    /// deterministic when one user holds the name and another the email.
    async fn find_user_by_name_or_email(
        &self,
        name: &str,
        email: &str,
    ) -> RepoResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE name = $1 OR email = $2 \
             ORDER BY (name = $1) DESC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            r#"INSERT INTO users (id, name, email, password_hash, "type")
               VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.user_type.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)
    }

    async fn list_users(&self, include_admins: bool) -> RepoResult<Vec<User>> {
        let sql = format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE $1 OR "type" <> 'admin' ORDER BY created_at"#
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(include_admins)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_visible_posts(&self) -> RepoResult<Vec<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE is_hidden = false ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Post>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_posts_by_author(&self, author_id: Uuid) -> RepoResult<Vec<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE author_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        let sql = format!(
            "INSERT INTO posts (id, title, content, author_id, is_hidden, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, false, NOW(), NOW()) RETURNING {POST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(Uuid::new_v4())
            .bind(&post.title)
            .bind(&post.content)
            .bind(post.author_id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// update_post
    ///
    /// The ownership predicate lives in the WHERE clause, so the check and the write
    /// are one atomic statement.
    async fn update_post(
        &self,
        id: Uuid,
        author_id: Uuid,
        changes: PostChanges,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE posts SET title = $3, content = $4, is_hidden = $5, updated_at = NOW() \
             WHERE id = $1 AND author_id = $2",
        )
        .bind(id)
        .bind(author_id)
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(changes.is_hidden)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_post_hidden(&self, id: Uuid, author_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE posts SET is_hidden = NOT is_hidden, updated_at = NOW() \
             WHERE id = $1 AND author_id = $2",
        )
        .bind(id)
        .bind(author_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-memory implementation (tests and database-less runs) ---

/// MemoryRepository
///
/// An in-process `Repository` with the same observable semantics as the Postgres
/// one, including unique name/email enforcement and owner-scoped writes. Used by
/// the test suite so handlers and the auth chain run without a database.
#[derive(Default)]
pub struct MemoryRepository {
    users: RwLock<Vec<User>>,
    posts: RwLock<Vec<Post>>,
    /// When true, every operation fails as if the database were unreachable.
    pub should_fail: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> RepoResult<()> {
        if self.should_fail {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        self.check()?;
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_credentials_by_email(
        &self,
        email: &str,
    ) -> RepoResult<Option<UserCredentials>> {
        self.check()?;
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .map(|u| UserCredentials {
                id: u.id,
                password_hash: u.password_hash.clone(),
            }))
    }

    async fn find_user_by_name_or_email(
        &self,
        name: &str,
        email: &str,
    ) -> RepoResult<Option<User>> {
        self.check()?;
        let users = self.users.read().await;
        let found = users
            .iter()
            .find(|u| u.name == name)
            .or_else(|| users.iter().find(|u| u.email == email));
        Ok(found.cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        self.check()?;
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.name == user.name) {
            return Err(RepositoryError::Duplicate(UniqueField::Name));
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate(UniqueField::Email));
        }

        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            user_type: user.user_type,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn list_users(&self, include_admins: bool) -> RepoResult<Vec<User>> {
        self.check()?;
        Ok(self
            .users
            .read()
            .await
            .iter()
            .filter(|u| include_admins || u.user_type != UserType::Admin)
            .cloned()
            .collect())
    }

    async fn list_visible_posts(&self) -> RepoResult<Vec<Post>> {
        self.check()?;
        Ok(self
            .posts
            .read()
            .await
            .iter()
            .rev()
            .filter(|p| !p.is_hidden)
            .cloned()
            .collect())
    }

    async fn list_posts_by_author(&self, author_id: Uuid) -> RepoResult<Vec<Post>> {
        self.check()?;
        Ok(self
            .posts
            .read()
            .await
            .iter()
            .rev()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect())
    }

    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        self.check()?;
        Ok(self.posts.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        self.check()?;
        let now = Utc::now();
        let created = Post {
            id: Uuid::new_v4(),
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            is_hidden: false,
            created_at: now,
            updated_at: now,
        };
        self.posts.write().await.push(created.clone());
        Ok(created)
    }

    async fn update_post(
        &self,
        id: Uuid,
        author_id: Uuid,
        changes: PostChanges,
    ) -> RepoResult<bool> {
        self.check()?;
        let mut posts = self.posts.write().await;
        let Some(post) = posts
            .iter_mut()
            .find(|p| p.id == id && p.author_id == author_id)
        else {
            return Ok(false);
        };
        post.title = changes.title;
        post.content = changes.content;
        post.is_hidden = changes.is_hidden;
        post.updated_at = Utc::now();
        Ok(true)
    }

    async fn toggle_post_hidden(&self, id: Uuid, author_id: Uuid) -> RepoResult<bool> {
        self.check()?;
        let mut posts = self.posts.write().await;
        let Some(post) = posts
            .iter_mut()
            .find(|p| p.id == id && p.author_id == author_id)
        else {
            return Ok(false);
        };
        post.is_hidden = !post.is_hidden;
        post.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        self.check()?;
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        Ok(posts.len() < before)
    }
}
