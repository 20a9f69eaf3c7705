/// Router Module Index
///
/// Routes are grouped by the weakest identity they accept. The groups are merged
/// into one router under `/api/v1`; paths shared between groups (`/posts`, `/users`)
/// differ only by method.

/// Anonymous access: the public feed, sign-up and login.
pub mod public;

/// Handlers that take an `AuthUser`; a missing or bad token is rejected with 401.
pub mod authenticated;

/// Handlers that take an `AdminUser`; non-admins are rejected with 403.
pub mod admin;
