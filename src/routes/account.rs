use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Account Router Module
///
/// The session lifecycle. Both form submissions answer with a redirect; failures travel to
/// the next page as flash messages.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            get(handlers::register_page).post(handlers::register),
        )
        .route("/login", get(handlers::login_page).post(handlers::login))
        // GET /logout
        // Clears the session whether or not one exists.
        .route("/logout", get(handlers::logout))
}
