//! HTTP API
//!
//! Every JSON response carries a `success` flag. Failures are rendered by
//! [`AppError`](crate::error::AppError).

pub mod admin;
pub mod auth;
pub mod detection;
pub mod mandi;
pub mod notifications;
pub mod schemes;
pub mod weather;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ServerConfig;
use crate::AppContext;

pub type SharedContext = Arc<AppContext>;

/// Headroom over the upload limit for the other multipart fields
const FORM_OVERHEAD: usize = 1024 * 1024;

/// Create the API router
pub fn create_router(ctx: SharedContext) -> Router {
    let body_limit = ctx.config.upload.max_file_size + FORM_OVERHEAD;
    let cors = cors_layer(&ctx.config.server);

    Router::new()
        .route("/health", get(health))
        .route("/api/auth", post(auth::auth))
        .route(
            "/api/disease-detection",
            get(detection::history).post(detection::detect),
        )
        .route(
            "/api/government-schemes",
            get(schemes::query).post(schemes::action),
        )
        .route("/api/mandi-prices", get(mandi::query).post(mandi::update))
        .route("/api/weather", get(weather::weather))
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/:id/read", post(notifications::mark_read))
        .route("/api/admin/analytics", get(admin::analytics))
        .route("/api/admin/tasks", get(admin::tasks))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if config.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Query values where empty or "all" mean no filter
pub(crate) fn filter_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}
