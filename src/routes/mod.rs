//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static player front-end from `./static` with index fallback
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // Session
        .route("/api/v1/health", get(http::http_health))
        .route(
            "/api/v1/session",
            post(http::http_post_session).delete(http::http_delete_session),
        )
        .route("/api/v1/login", post(http::http_post_login))
        // Courses
        .route("/api/v1/courses", get(http::http_get_courses))
        .route("/api/v1/courses/:course_id/view", get(http::http_get_view))
        .route("/api/v1/courses/:course_id/week", post(http::http_post_week))
        .route("/api/v1/courses/:course_id/lesson", post(http::http_post_lesson))
        .route("/api/v1/courses/:course_id/complete", post(http::http_post_complete))
        .route("/api/v1/courses/:course_id/responses", post(http::http_post_response))
        .route("/api/v1/courses/:course_id/submit", post(http::http_post_submit))
        .route(
            "/api/v1/courses/:course_id/weeks/:week/lessons/:lesson/slides",
            get(http::http_get_slides),
        )
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
