// src/handlers/catalog.rs

use axum::{Json, response::IntoResponse};

use crate::models::subject::CatalogResponse;

/// Subjects, difficulties and per-subject topic lists.
pub async fn get_catalog() -> impl IntoResponse {
    Json(CatalogResponse::build())
}
