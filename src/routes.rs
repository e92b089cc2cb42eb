// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{catalog, progress, quiz},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (catalog, quizzes, progress).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (provider, progress store, live quizzes).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
        HeaderValue::from_static("http://localhost:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/", post(quiz::create_quiz))
        .route("/{id}", get(quiz::get_quiz).delete(quiz::delete_quiz))
        .route("/{id}/difficulty", post(quiz::choose_difficulty))
        .route("/{id}/topic", post(quiz::choose_topic))
        .route("/{id}/messages", post(quiz::send_message))
        .route("/{id}/review", post(quiz::request_review))
        .route("/{id}/review/done", post(quiz::finish_review))
        .route("/{id}/play-again", post(quiz::play_again));

    let progress_routes = Router::new().route(
        "/",
        get(progress::get_progress).delete(progress::clear_progress),
    );

    Router::new()
        .route("/api/catalog", get(catalog::get_catalog))
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/progress", progress_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
