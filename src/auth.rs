use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    credentials::CredentialState,
    error::{ApiError, ErrorCode},
    models::UserType,
    repository::RepositoryState,
};

/// AuthUser
///
/// The authenticated identity of one request, rebuilt from a verified bearer token
/// and the current `users` row. Handlers receive it as an argument; it is never
/// stored anywhere shared between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub user_type: UserType,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.user_type.is_admin()
    }
}

/// AuthUser Extractor Implementation
///
/// Runs the token chain in order and stops at the first failure:
/// 1. Token extraction: `Authorization: Bearer <token>`; absent or malformed is 401.
/// 2. Token verification: signature, structure and expiry; any failure is 401.
/// 3. Identity resolution: the token's user must still exist; otherwise 401.
/// 4. Identity attachment: the resolved `{id, type}` is returned to the handler.
///
/// Only step 3 awaits I/O.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    CredentialState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            tracing::debug!("missing or malformed authorization header");
            ApiError::Unauthorized(ErrorCode::MissingBearerToken)
        })?;

        let credentials = CredentialState::from_ref(state);
        if !credentials.verify_token(token) {
            tracing::debug!("bearer token failed verification");
            return Err(ApiError::Unauthorized(ErrorCode::InvalidToken));
        }
        let subject = credentials
            .decode_token(token)
            .map_err(|_| ApiError::Unauthorized(ErrorCode::InvalidToken))?;

        let repo = RepositoryState::from_ref(state);
        let user = repo.find_user(subject.id).await?.ok_or_else(|| {
            tracing::debug!(user_id = %subject.id, "token refers to a user that no longer exists");
            ApiError::Unauthorized(ErrorCode::InvalidToken)
        })?;

        Ok(AuthUser {
            id: user.id,
            user_type: user.user_type,
        })
    }
}

/// AdminUser
///
/// The opt-in admin gate: an `AuthUser` whose role is `admin`. Any other
/// authenticated caller is rejected with 403 before the handler runs.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    CredentialState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::info!(user_id = %user.id, "non-admin rejected by admin gate");
            return Err(ApiError::Forbidden(ErrorCode::AdminRoleRequired));
        }
        Ok(AdminUser(user))
    }
}

/// Reads the token from `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively; an empty token counts as missing.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
