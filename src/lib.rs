use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use tower_cookies::CookieManagerLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod models;
pub mod repository;

// Routing segregation (Public, Account, Admin).
pub mod routes;
use routes::{account, admin, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{RepositoryState, SqliteRepository};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and the page/form schemas into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_all_posts, handlers::show_post, handlers::add_comment,
        handlers::register_page, handlers::register, handlers::login_page, handlers::login,
        handlers::logout, handlers::new_post_page, handlers::add_new_post,
        handlers::edit_post_page, handlers::edit_post, handlers::delete_post,
        handlers::about, handlers::contact
    ),
    components(
        schemas(
            models::BlogPost, models::Comment, models::CommentView, models::Viewer,
            models::PageContext, models::PostListPage, models::PostPage, models::FormPage,
            models::PostFormPage, models::StaticPage, models::RegisterForm, models::LoginForm,
            models::CommentForm, models::PostForm, flash::FlashMessage, flash::FlashKind,
        )
    ),
    tags(
        (name = "blog", description = "Blog pages, accounts and post administration")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single application context shared by every request: storage handle plus configuration.
/// Handlers receive it explicitly instead of reaching for globals.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access.
    pub repo: RepositoryState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, guards the admin routes, and applies the cookie and
/// observability layers.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(account::account_routes())
        // Admin Routes: every one of them sits behind the id-1 check.
        .merge(admin::admin_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_only,
        )))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // Outermost, so the session and flash cookies are available to every extractor.
        .layer(CookieManagerLayer::new())
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of a request carries its `x-request-id`.
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
