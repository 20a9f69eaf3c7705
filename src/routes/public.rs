use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token. The post feed only ever returns posts with
/// `isHidden = false`; that filter lives in the repository query.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /posts
        .route("/posts", get(handlers::list_posts))
        // POST /users/register
        // Self-service sign-up; the account type is fixed to blogger.
        .route("/users/register", post(handlers::register_user))
        // POST /users/login
        // Returns `{token}` on success. Unknown email and wrong password are indistinguishable.
        .route("/users/login", post(handlers::login_user))
}
