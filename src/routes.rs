use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use futures::StreamExt;
use serde_json::json;

use crate::{AppState, error::AppResult, models::Movie};

pub const STREAM_JSON: &str = "application/stream+json";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/movie", get(list_movies).post(create_movie).put(update_movie))
        .route("/movie/{id}", delete(delete_movie))
        .with_state(state)
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    Json(movie): Json<Movie>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    let saved = state.movies.create(movie).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Newline-delimited JSON, one movie per line, paced by the service.
pub async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let movies = state.movies.list().await?;
    let lines = movies.map(|movie| {
        serde_json::to_vec(&movie).map(|mut line| {
            line.push(b'\n');
            Bytes::from(line)
        })
    });

    Ok(([(header::CONTENT_TYPE, STREAM_JSON)], Body::from_stream(lines)).into_response())
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Json(movie): Json<Movie>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.movies.update(movie).await?))
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.movies.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
