use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    response::Response,
    routing::get,
};
use std::any::Any;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod validation;

// Routing, grouped by required identity (public, authenticated, admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use credentials::{CredentialService, CredentialState};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every `/api/v1` endpoint, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_posts, handlers::create_post, handlers::remove_post,
        handlers::update_post, handlers::toggle_post_hidden, handlers::list_users,
        handlers::list_own_posts, handlers::create_user, handlers::register_user,
        handlers::login_user
    ),
    components(
        schemas(
            models::Post, models::UserSummary, models::UserType, models::LoginResponse,
            models::CreatePostRequest, models::UpdatePostRequest, models::CreateUserRequest,
            models::RegisterRequest, models::LoginRequest,
            error::ErrorCode, error::ErrorResponse, error::ValidationErrorResponse,
            error::ValidationIssue,
        )
    ),
    tags(
        (name = "blog-api", description = "Blog posts and users")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable services handed to every request. Nothing in here changes
/// after startup, so no request can observe another request's identity.
#[derive(Clone)]
pub struct AppState {
    /// Persistence gateway (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Password hashing and bearer-token signing.
    pub credentials: CredentialState,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: &AppConfig) -> Self {
        Self {
            repo,
            credentials: CredentialState::new(CredentialService::from_config(config)),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for CredentialState {
    fn from_ref(app_state: &AppState) -> CredentialState {
        app_state.credentials.clone()
    }
}

/// create_router
///
/// Assembles the versioned API, health check, documentation and fallback, then
/// wraps everything in the request-id, tracing, panic and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(cors::Any)
        .allow_origin(cors::Any)
        .allow_headers(cors::Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // Access control is carried by the extractors each handler takes, so the
    // three groups can share paths and differ only by method.
    let api = Router::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes());

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "ok" }))
        .nest("/api/v1", api)
        .fallback(handlers::route_not_found)
        // After every route is registered, so each path's method router picks it up.
        .method_not_allowed_fallback(handlers::route_not_found)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
                // Innermost, so a panic still gets a request id and a trace span.
                .layer(CatchPanicLayer::custom(panic_response)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span carrying the request id, so every log line of
/// one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

/// A panicking handler answers with the same opaque 500 as any other internal failure.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    tracing::error!(panic = %detail, "handler panicked");
    error::internal_error_response()
}
