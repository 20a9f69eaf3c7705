use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri, Path, State},
    http::{Method, StatusCode, request::Parts},
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    error::{ApiError, ErrorCode, ErrorResponse, ValidationErrorResponse},
    models::{
        CreatePostRequest, CreateUserRequest, LoginRequest, LoginResponse, NewUser, Post,
        RegisterRequest, UpdatePostRequest, User, UserDraft, UserSummary,
    },
    repository::{RepositoryError, UniqueField},
    validation::ValidatedJson,
};

// --- Posts ---

/// PostId
///
/// The `{postId}` path segment. A segment that is not a UUID cannot name a post,
/// so it is rejected as a missing post rather than as a malformed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostId(pub Uuid);

impl<S> FromRequestParts<S> for PostId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::Internal(format!("postId path segment unavailable: {e}")))?;
        raw.parse()
            .map(PostId)
            .map_err(|_| ApiError::post_not_found(raw))
    }
}

/// list_posts
///
/// [Public Route] Lists every post that is not hidden. No pagination.
#[utoipa::path(
    get,
    path = "/api/v1/posts",
    responses((status = 200, description = "Visible posts", body = [Post]))
)]
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(state.repo.list_visible_posts().await?))
}

/// create_post
///
/// [Authenticated Route] Creates a post owned by the caller.
///
/// The body is validated before the caller's identity is consulted, so an invalid
/// payload is reported as such even without a token.
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Invalid payload", body = ValidationErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn create_post(
    auth: Result<AuthUser, ApiError>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let AuthUser { id: author_id, .. } = auth?;
    let post = state
        .repo
        .create_post(payload.into_new_post(author_id))
        .await?;
    tracing::info!(post_id = %post.id, %author_id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// remove_post
///
/// [Authenticated Route] Deletes a post.
///
/// *Authorization*: the author, or any admin. This is the only post operation where
/// the admin role bypasses ownership.
#[utoipa::path(
    delete,
    path = "/api/v1/posts/{postId}",
    params(("postId" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Neither author nor admin", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn remove_post(
    user: AuthUser,
    State(state): State<AppState>,
    PostId(post_id): PostId,
) -> Result<StatusCode, ApiError> {
    let post = state
        .repo
        .find_post(post_id)
        .await?
        .ok_or_else(|| ApiError::post_not_found(post_id))?;

    if !user.is_admin() && post.author_id != user.id {
        tracing::info!(%post_id, user_id = %user.id, "remove denied: not the author");
        return Err(ApiError::Forbidden(
            ErrorCode::YouAreNotAllowedToRemoveOthersPost,
        ));
    }

    if !state.repo.delete_post(post_id).await? {
        // Deleted concurrently between the lookup and this statement.
        return Err(ApiError::post_not_found(post_id));
    }
    Ok(StatusCode::OK)
}

/// update_post
///
/// [Authenticated Route] Replaces title, content and visibility of the caller's own post.
///
/// *Authorization*: author only; admins get no bypass here. The write is scoped to
/// `(id, author_id)` and must affect a row, otherwise the post is reported missing.
/// As with `create_post`, payload errors take precedence over authentication errors.
#[utoipa::path(
    put,
    path = "/api/v1/posts/{postId}",
    params(("postId" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated"),
        (status = 400, description = "Invalid payload", body = ValidationErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn update_post(
    auth: Result<AuthUser, ApiError>,
    State(state): State<AppState>,
    PostId(post_id): PostId,
    ValidatedJson(payload): ValidatedJson<UpdatePostRequest>,
) -> Result<StatusCode, ApiError> {
    let user = auth?;
    ensure_author(&state, &user, post_id).await?;

    let updated = state
        .repo
        .update_post(post_id, user.id, payload.into_changes())
        .await?;
    if !updated {
        tracing::warn!(%post_id, "post vanished between ownership check and update");
        return Err(ApiError::post_not_found(post_id));
    }
    Ok(StatusCode::OK)
}

/// toggle_post_hidden
///
/// [Authenticated Route] Flips `isHidden` on the caller's own post. Author only.
#[utoipa::path(
    patch,
    path = "/api/v1/posts/{postId}",
    params(("postId" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Visibility toggled"),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn toggle_post_hidden(
    user: AuthUser,
    State(state): State<AppState>,
    PostId(post_id): PostId,
) -> Result<StatusCode, ApiError> {
    ensure_author(&state, &user, post_id).await?;

    if !state.repo.toggle_post_hidden(post_id, user.id).await? {
        tracing::warn!(%post_id, "post vanished between ownership check and toggle");
        return Err(ApiError::post_not_found(post_id));
    }
    Ok(StatusCode::OK)
}

/// NotFound when the post is absent, Forbidden when the caller did not write it.
async fn ensure_author(state: &AppState, user: &AuthUser, post_id: Uuid) -> Result<(), ApiError> {
    let post = state
        .repo
        .find_post(post_id)
        .await?
        .ok_or_else(|| ApiError::post_not_found(post_id))?;

    if post.author_id != user.id {
        tracing::info!(%post_id, user_id = %user.id, "update denied: not the author");
        return Err(ApiError::Forbidden(
            ErrorCode::YouAreNotAllowedToUpdateOthersPost,
        ));
    }
    Ok(())
}

// --- Users ---

/// list_users
///
/// [Authenticated Route] Lists users.
///
/// Admins see `{id, name, email}` for everyone. Anyone else sees `{name, email}`
/// of non-admin users only.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses((status = 200, description = "Users", body = [UserSummary]))
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let is_admin = user.is_admin();
    let users = state.repo.list_users(is_admin).await?;

    let view = if is_admin {
        UserSummary::for_admin
    } else {
        UserSummary::for_blogger
    };
    Ok(Json(users.iter().map(view).collect()))
}

/// list_own_posts
///
/// [Authenticated Route] All posts written by the caller, hidden ones included.
#[utoipa::path(
    get,
    path = "/api/v1/users/posts",
    responses((status = 200, description = "My posts", body = [Post]))
)]
pub async fn list_own_posts(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(state.repo.list_posts_by_author(id).await?))
}

/// create_user
///
/// [Admin Route] Creates a user with an explicit role. Payload errors are reported
/// before the admin gate's outcome.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 204, description = "Created"),
        (status = 400, description = "Invalid payload or name/email taken", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    )
)]
pub async fn create_user(
    admin: Result<AdminUser, ApiError>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<StatusCode, ApiError> {
    let AdminUser(admin) = admin?;
    let user = create_account(&state, payload.into_draft()).await?;
    tracing::info!(user_id = %user.id, created_by = %admin.id, role = %user.user_type, "user created");
    Ok(StatusCode::NO_CONTENT)
}

/// register_user
///
/// [Public Route] Self-service sign-up. The new account is always a blogger.
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 204, description = "Registered"),
        (status = 400, description = "Invalid payload or name/email taken", body = ErrorResponse)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    let user = create_account(&state, payload.into_draft()).await?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(StatusCode::NO_CONTENT)
}

/// login_user
///
/// [Public Route] Exchanges email and password for a bearer token.
///
/// An unknown email and a wrong password produce the same 401 so the endpoint
/// cannot be used to discover registered addresses.
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Email or password incorrect", body = ErrorResponse)
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let Some(stored) = state.repo.find_user_credentials_by_email(&email).await? else {
        return Err(ApiError::Unauthorized(ErrorCode::EmailOrPasswordIncorrect));
    };

    let user_id = stored.id;
    let credentials = state.credentials.clone();
    let matches =
        run_blocking(move || credentials.verify_password(&password, &stored.password_hash))
            .await?;
    if !matches {
        return Err(ApiError::Unauthorized(ErrorCode::EmailOrPasswordIncorrect));
    }

    let token = state.credentials.issue_token(user_id)?;
    Ok(Json(LoginResponse { token }))
}

/// create_account
///
/// The creation routine shared by `register_user` and `create_user`. A single
/// lookup finds any user holding the name or the email; a name clash is reported
/// in preference to an email clash.
pub async fn create_account(state: &AppState, draft: UserDraft) -> Result<User, ApiError> {
    if let Some(existing) = state
        .repo
        .find_user_by_name_or_email(&draft.name, &draft.email)
        .await?
    {
        let field = if existing.name == draft.name {
            UniqueField::Name
        } else {
            UniqueField::Email
        };
        return Err(duplicate(field));
    }

    let UserDraft {
        user_type,
        name,
        email,
        password,
    } = draft;

    let credentials = state.credentials.clone();
    let password_hash = run_blocking(move || credentials.hash_password(&password)).await??;

    state
        .repo
        .create_user(NewUser {
            user_type,
            name,
            email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent sign-up; the constraint still names the field.
            RepositoryError::Duplicate(field) => duplicate(field),
            other => other.into(),
        })
}

fn duplicate(field: UniqueField) -> ApiError {
    ApiError::BadRequest(match field {
        UniqueField::Name => ErrorCode::NameAlreadyUsed,
        UniqueField::Email => ErrorCode::EmailAlreadyUsed,
    })
}

/// Password hashing is CPU-bound; keep it off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))
}

// --- Fallback ---

/// route_not_found
///
/// Catches every request no route matched, including a known path requested
/// with a method it does not serve.
pub async fn route_not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound {
        code: ErrorCode::RouteNotFound,
        message: format!("Cannot {method} {}", uri.path()),
    }
}
