pub mod auth;
pub mod categories;
pub mod chapters;
pub mod error;
pub mod likes;
pub mod messages;
pub mod middleware;
pub mod pagination;
pub mod permissions;
pub mod projections;
pub mod themes;
pub mod validation;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use tracing::error;

use forum_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;

/// Every forum route. Anonymous requests reach all of them; write handlers
/// reject them through the `Requester` extractor.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Accounts and tokens
        .route("/auth/users/", post(auth::register))
        .route("/auth/users/me/", get(auth::me).delete(auth::delete_me))
        .route("/auth/token/login/", post(auth::login))
        .route("/auth/token/logout/", post(auth::logout))
        // Chapters
        .route("/chapters/", get(chapters::list_chapters))
        .route("/chapters/{id}/", get(chapters::get_chapter))
        .route("/chapters/create/", post(chapters::create_chapter))
        .route(
            "/chapters/update/{id}/",
            patch(chapters::update_chapter).delete(chapters::delete_chapter),
        )
        // Categories
        .route("/categories/", get(categories::list_categories))
        .route("/categories/{id}/", get(categories::get_category))
        .route("/categories/create/", post(categories::create_category))
        .route(
            "/categories/update/{id}/",
            patch(categories::update_category).delete(categories::delete_category),
        )
        // Themes
        .route("/themes/", get(themes::list_themes))
        .route("/themes/{id}/", get(themes::get_theme))
        .route("/themes/create/", post(themes::create_theme))
        .route("/themes/update/{id}/", patch(themes::update_theme))
        .route("/themes/delete/{id}/", delete(themes::delete_theme))
        // Messages
        .route("/messages/", get(messages::list_messages))
        .route("/messages/{id}/", get(messages::get_message))
        .route("/messages/{id}/likes/", get(likes::list_likes))
        .route("/messages/create/", post(messages::create_message))
        .route("/messages/update/{id}/", patch(messages::update_message))
        .route("/messages/delete/{id}/", delete(messages::delete_message))
        // Likes
        .route("/likes/create/", post(likes::create_like))
        .route("/likes/update/{id}/", patch(likes::update_like))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::authenticate))
        .with_state(state)
}

/// Runs blocking database work off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
}
