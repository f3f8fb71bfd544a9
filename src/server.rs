//! HTTP server and routes.

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let book_routes = Router::new()
        .route("/", get(handlers::books_list))
        .route("/", post(handlers::books_create))
        .route("/top", get(handlers::books_top_rated))
        .route("/{id}", get(handlers::books_get))
        .route("/{id}", put(handlers::books_update))
        .route("/{id}", delete(handlers::books_delete))
        .route("/{id}/reviews", get(handlers::books_get_reviews))
        .route("/{id}/reviews", post(handlers::books_add_review));

    let category_routes = Router::new()
        .route("/", get(handlers::categories_list))
        .route("/", post(handlers::categories_create))
        .route("/{id}", get(handlers::categories_get))
        .route("/{id}/books", get(handlers::categories_books));

    let auth_routes = Router::new()
        .route("/login", post(handlers::auth_login))
        .route("/register", post(handlers::auth_register))
        .route("/logout", post(handlers::auth_logout))
        .route("/me", get(handlers::auth_me));

    Router::new()
        .route("/", get(handlers::index))
        .nest("/api/books", book_routes)
        .nest("/api/categories", category_routes)
        .nest("/api/auth", auth_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
