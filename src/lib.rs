pub mod comment_tree;
pub mod config;
pub mod db;
pub mod error;
pub mod featured;
pub mod models;
pub mod reactions;
pub mod routes;
pub mod slug;

use std::sync::Arc;

use axum::{Router, response::IntoResponse, routing::get};
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use routes::{
    admin_routes, auth_routes, categories_routes, comments_routes, posts_routes,
    subscribers_routes,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub secret_key: Arc<str>,
}

impl AppState {
    pub fn new(pool: SqlitePool, secret_key: impl Into<Arc<str>>) -> Self {
        Self {
            pool,
            secret_key: secret_key.into(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/posts", posts_routes())
        .nest("/api/comments", comments_routes())
        .nest("/api/categories", categories_routes())
        .nest("/api/subscribers", subscribers_routes())
        .nest("/api/admin", admin_routes())
        .route("/api/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    axum::Json(serde_json::json!({"status": "healthy"}))
}
