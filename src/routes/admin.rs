use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Every route that mutates a post. `create_router` layers `auth::admin_only` over this whole
/// router, so handlers here run only for the administrator and can rely on the `AdminUser`
/// extension being present.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/new-post",
            get(handlers::new_post_page).post(handlers::add_new_post),
        )
        .route(
            "/edit-post/{post_id}",
            get(handlers::edit_post_page).post(handlers::edit_post),
        )
        // GET /delete/{post_id}
        // Deletion is a plain link in the post page, hence GET.
        .route("/delete/{post_id}", get(handlers::delete_post))
}
