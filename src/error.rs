use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{credentials::CredentialError, repository::RepositoryError};

/// ErrorCode
///
/// Stable, machine-readable reason attached to every taxonomy error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    EmailOrPasswordIncorrect,
    NameAlreadyUsed,
    EmailAlreadyUsed,
    MissingBearerToken,
    InvalidToken,
    AdminRoleRequired,
    YouAreNotAllowedToRemoveOthersPost,
    YouAreNotAllowedToUpdateOthersPost,
    PostNotFound,
    RouteNotFound,
    InternalServerError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailOrPasswordIncorrect => "EMAIL_OR_PASSWORD_INCORRECT",
            Self::NameAlreadyUsed => "NAME_ALREADY_USED",
            Self::EmailAlreadyUsed => "EMAIL_ALREADY_USED",
            Self::MissingBearerToken => "MISSING_BEARER_TOKEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::AdminRoleRequired => "ADMIN_ROLE_REQUIRED",
            Self::YouAreNotAllowedToRemoveOthersPost => "YOU_ARE_NOT_ALLOWED_TO_REMOVE_OTHERS_POST",
            Self::YouAreNotAllowedToUpdateOthersPost => "YOU_ARE_NOT_ALLOWED_TO_UPDATE_OTHERS_POST",
            Self::PostNotFound => "POST_NOT_FOUND",
            Self::RouteNotFound => "ROUTE_NOT_FOUND",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Human-readable text sent next to the code.
    fn default_message(self) -> &'static str {
        match self {
            Self::EmailOrPasswordIncorrect => "Email or password incorrect",
            Self::NameAlreadyUsed => "Name already used",
            Self::EmailAlreadyUsed => "Email already used",
            Self::MissingBearerToken => "Missing or malformed bearer token",
            Self::InvalidToken => "Invalid or expired token",
            Self::AdminRoleRequired => "Admin role required",
            Self::YouAreNotAllowedToRemoveOthersPost => "You are not allowed to remove others' post",
            Self::YouAreNotAllowedToUpdateOthersPost => "You are not allowed to update others' post",
            Self::PostNotFound => "Post not found",
            Self::RouteNotFound => "Route not found",
            Self::InternalServerError => "Internal server error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed constraint of a validated payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

/// Body of every taxonomy error and of the generic 500.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

/// Body of a schema validation failure: all violated constraints at once.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ValidationErrorResponse {
    pub status: String,
    pub errors: Vec<ValidationIssue>,
}

/// ApiError
///
/// Error type returned by every handler and extractor. The `Display` text is for
/// logs only; clients see the code and message from `into_response`, and the three
/// internal variants are collapsed into a bare 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(ErrorCode),
    #[error("unauthorized: {0}")]
    Unauthorized(ErrorCode),
    #[error("forbidden: {0}")]
    Forbidden(ErrorCode),
    #[error("not found: {message}")]
    NotFound { code: ErrorCode, message: String },
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<ValidationIssue>),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn post_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            code: ErrorCode::PostNotFound,
            message: format!("Post with id {id} doesn't exist"),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Repository(_) | Self::Credential(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The machine-readable code a client would see.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::BadRequest(code) | Self::Unauthorized(code) | Self::Forbidden(code) => {
                Some(*code)
            }
            Self::NotFound { code, .. } => Some(*code),
            Self::Validation(_) => None,
            Self::Repository(_) | Self::Credential(_) | Self::Internal(_) => {
                Some(ErrorCode::InternalServerError)
            }
        }
    }
}

/// The fixed 500 body; shared with the panic handler.
pub fn internal_error_response() -> Response {
    error_body(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::InternalServerError,
        ErrorCode::InternalServerError.default_message().to_string(),
    )
}

fn error_body(status: StatusCode, code: ErrorCode, message: String) -> Response {
    (status, Json(ErrorResponse { code, message })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::BadRequest(code) | Self::Unauthorized(code) | Self::Forbidden(code) => {
                error_body(status, code, code.default_message().to_string())
            }
            Self::NotFound { code, message } => error_body(status, code, message),
            Self::Validation(errors) => (
                status,
                Json(ValidationErrorResponse {
                    status: "failed".to_string(),
                    errors,
                }),
            )
                .into_response(),
            internal => {
                tracing::error!(error = %internal, "request failed");
                internal_error_response()
            }
        }
    }
}
