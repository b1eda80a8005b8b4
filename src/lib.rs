pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

#[cfg(test)]
pub mod testing;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use handlers::{calls, public, AppContext};

/// Build the full router: public endpoints, the versioned API and global middleware
pub fn app(ctx: AppContext) -> Router {
    let body_limit = ctx.config.api.max_request_size_bytes;
    let cors = middleware::cors_layer(&ctx.config.cors);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .nest("/api/v1", calls::routes())
        .fallback(public::not_found)
        // Global middleware
        .layer(Extension(ctx))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
