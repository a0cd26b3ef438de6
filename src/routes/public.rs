use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable by any visitor. Handlers still receive the resolved `CurrentUser` so
/// pages can tailor what they offer.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Every post, oldest first.
        .route("/", get(handlers::get_all_posts))
        // GET/POST /post/{post_id}
        // Read a post with its comments; POST adds a comment and requires a session.
        .route(
            "/post/{post_id}",
            get(handlers::show_post).post(handlers::add_comment),
        )
        .route("/about", get(handlers::about))
        .route("/contact", get(handlers::contact))
}
