use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Roles ---

/// UserType
///
/// The closed set of roles a user can hold. Admins bypass ownership when removing
/// posts and may create users of any role; bloggers only manage their own posts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum UserType {
    Admin,
    #[default]
    Blogger,
}

impl UserType {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Blogger => "blogger",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown user type: {0:?}")]
pub struct UnknownUserType(pub String);

impl FromStr for UserType {
    type Err = UnknownUserType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "blogger" => Ok(Self::Blogger),
            other => Err(UnknownUserType(other.to_string())),
        }
    }
}

// Lets sqlx decode the TEXT `type` column straight into the enum.
impl TryFrom<String> for UserType {
    type Error = UnknownUserType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// --- Persisted records ---

/// User
///
/// A row of the `users` table. Has no `Serialize` impl so the password hash cannot
/// reach a response; listings go through `UserSummary`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[sqlx(rename = "type", try_from = "String")]
    pub user_type: UserType,
}

/// The only columns login needs: who the user is and what to verify against.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub password_hash: String,
}

/// Insert payload for the `users` table, produced after hashing.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_type: UserType,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Post
///
/// A row of the `posts` table. `author_id` is fixed at creation; `updated_at` moves on
/// every edit or visibility toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub is_hidden: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
}

/// Full replacement of the mutable post fields.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub content: String,
    pub is_hidden: bool,
}

// --- Response views ---

/// UserSummary
///
/// A user as shown by `GET /users`. `id` is only filled in for admin callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
}

impl UserSummary {
    pub fn for_admin(user: &User) -> Self {
        Self {
            id: Some(user.id),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }

    pub fn for_blogger(user: &User) -> Self {
        Self {
            id: None,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
}

// --- Request payloads ---
//
// Every field is optional at the serde level so that a missing field becomes a
// `required` violation collected alongside the others, instead of aborting
// deserialization on the first absent key.

/// CreatePostRequest
///
/// Body of `POST /posts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct CreatePostRequest {
    #[validate(
        required(message = "is required"),
        length(min = 10, max = 70, message = "title must be between 10 and 70 characters")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "is required"),
        length(min = 20, message = "content must be at least 20 characters")
    )]
    pub content: Option<String>,
}

impl CreatePostRequest {
    /// Converts a validated payload; `required` has already guaranteed presence.
    pub fn into_new_post(self, author_id: Uuid) -> NewPost {
        NewPost {
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            author_id,
        }
    }
}

/// UpdatePostRequest
///
/// Body of `PUT /posts/{postId}`: a full replacement, so all three fields are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdatePostRequest {
    #[validate(
        required(message = "is required"),
        length(min = 10, max = 70, message = "title must be between 10 and 70 characters")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "is required"),
        length(min = 20, message = "content must be at least 20 characters")
    )]
    pub content: Option<String>,
    #[validate(required(message = "is required"))]
    pub is_hidden: Option<bool>,
}

impl UpdatePostRequest {
    pub fn into_changes(self) -> PostChanges {
        PostChanges {
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            is_hidden: self.is_hidden.unwrap_or_default(),
        }
    }
}

/// Validated input of the shared user-creation routine, password still in clear.
#[derive(Debug, Clone)]
pub struct UserDraft {
    pub user_type: UserType,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// CreateUserRequest
///
/// Body of the admin-only `POST /users`. The role is explicit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    #[serde(alias = "type")]
    #[validate(
        required(message = "is required"),
        custom(function = "validate_user_type")
    )]
    pub role: Option<String>,
    #[validate(
        required(message = "is required"),
        length(min = 1, message = "name must not be empty")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "is required"),
        email(message = "email must be a valid email address")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "is required"),
        length(min = 6, message = "password must be at least 6 characters")
    )]
    pub password: Option<String>,
}

impl CreateUserRequest {
    pub fn into_draft(self) -> UserDraft {
        UserDraft {
            // Already checked by `validate_user_type`; the fallback never escalates.
            user_type: self
                .role
                .as_deref()
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        }
    }
}

/// RegisterRequest
///
/// Body of the public `POST /users/register`. The role is always `blogger`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(
        required(message = "is required"),
        length(min = 1, message = "name must not be empty")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "is required"),
        email(message = "email must be a valid email address")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "is required"),
        length(min = 6, message = "password must be at least 6 characters")
    )]
    pub password: Option<String>,
}

impl RegisterRequest {
    pub fn into_draft(self) -> UserDraft {
        UserDraft {
            user_type: UserType::Blogger,
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        }
    }
}

/// LoginRequest
///
/// Body of `POST /users/login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(
        required(message = "is required"),
        email(message = "email must be a valid email address")
    )]
    pub email: Option<String>,
    #[validate(required(message = "is required"))]
    pub password: Option<String>,
}

fn validate_user_type(value: &str) -> Result<(), ValidationError> {
    match value.parse::<UserType>() {
        Ok(_) => Ok(()),
        Err(_) => {
            let mut error = ValidationError::new("enum");
            error.message = Some("Invalid role".into());
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLE_MESSAGE: &str = "title must be between 10 and 70 characters";
    const CONTENT_MESSAGE: &str = "content must be at least 20 characters";
    const REQUIRED_MESSAGE: &str = "is required";

    #[test]
    fn required_messages_match_attribute_text() {
        // The derive attributes cannot reference consts; keep them in sync by hand.
        let errors = UpdatePostRequest::default().validate().unwrap_err();
        let title = &errors.field_errors()["title"][0];
        assert_eq!(title.message.as_deref(), Some(REQUIRED_MESSAGE));

        let short = CreatePostRequest {
            title: Some("short".into()),
            content: Some("tiny".into()),
        };
        let errors = short.validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields["title"][0].message.as_deref(), Some(TITLE_MESSAGE));
        assert_eq!(fields["content"][0].message.as_deref(), Some(CONTENT_MESSAGE));
    }

    #[test]
    fn user_type_parses_only_known_roles() {
        assert_eq!("admin".parse::<UserType>().unwrap(), UserType::Admin);
        assert_eq!("blogger".parse::<UserType>().unwrap(), UserType::Blogger);
        assert!("Admin".parse::<UserType>().is_err());
        assert!("root".parse::<UserType>().is_err());
    }

    #[test]
    fn invalid_role_is_a_validation_failure_not_a_parse_failure() {
        let request = CreateUserRequest {
            role: Some("superuser".into()),
            name: Some("carol".into()),
            email: Some("carol@example.com".into()),
            password: Some("secret1".into()),
        };
        let errors = request.validate().unwrap_err();
        let issue = &errors.field_errors()["role"][0];
        assert_eq!(issue.message.as_deref(), Some("Invalid role"));
    }
}
