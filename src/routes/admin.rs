use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Admin Router Module
///
/// Endpoints gated by the `AdminUser` extractor: authentication first, then the
/// `admin` role check.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /users
        // Creates a user of either type. Answers 204 with no body.
        .route("/users", post(handlers::create_user))
}
