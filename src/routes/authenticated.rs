use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every handler here requires an `AuthUser`. Handlers with a body report payload
/// errors first and authentication errors second. Ownership rules are checked
/// inside the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /posts
        .route("/posts", post(handlers::create_post))
        // PUT/PATCH/DELETE /posts/{postId}
        // PUT and PATCH are author-only. DELETE additionally admits any admin.
        .route(
            "/posts/{postId}",
            put(handlers::update_post)
                .patch(handlers::toggle_post_hidden)
                .delete(handlers::remove_post),
        )
        // GET /users
        // The response shape depends on the caller's role.
        .route("/users", get(handlers::list_users))
        // GET /users/posts
        // The caller's own posts, hidden ones included.
        .route("/users/posts", get(handlers::list_own_posts))
}
