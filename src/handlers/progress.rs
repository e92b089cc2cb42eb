// src/handlers/progress.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{error::AppError, models::progress::DashboardResponse, services::progress::ProgressStore};

/// Dashboard data: full history plus per-subject statistics.
/// Unreadable storage shows up as an empty history, never as an error.
pub async fn get_progress(State(progress): State<ProgressStore>) -> impl IntoResponse {
    Json(DashboardResponse::from_progress(progress.get_progress().await))
}

/// Wipes the history for both subjects.
pub async fn clear_progress(
    State(progress): State<ProgressStore>,
) -> Result<impl IntoResponse, AppError> {
    progress.clear_progress().await?;
    Ok(StatusCode::NO_CONTENT)
}
