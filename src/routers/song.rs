use axum::{
    Router,
    extract::{FromRequestParts, Json, Path, State},
    http::{StatusCode, request::Parts},
    response::Response,
    routing::get,
};
use serde_json::Value;

use crate::AppState;
use crate::error::ApiError;
use crate::models::SongId;

/// `{id}` path segment. Anything but a non-negative integer is treated as
/// an unmatched route.
pub struct SongIdPath(pub SongId);

impl<S> FromRequestParts<S> for SongIdPath
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::NOT_FOUND)?;
        SongId::from_path(&raw)
            .map(SongIdPath)
            .ok_or(StatusCode::NOT_FOUND)
    }
}

pub async fn count_route(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.songs.count().await
}

pub async fn list_songs_route(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.songs.list().await
}

pub async fn get_song_route(
    State(state): State<AppState>,
    SongIdPath(id): SongIdPath,
) -> Result<Response, ApiError> {
    state.songs.get(id).await
}

pub async fn create_song_route(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    state.songs.create(body).await
}

pub async fn update_song_route(
    State(state): State<AppState>,
    SongIdPath(id): SongIdPath,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    state.songs.update(id, body).await
}

pub async fn delete_song_route(
    State(state): State<AppState>,
    SongIdPath(id): SongIdPath,
) -> Result<Response, ApiError> {
    state.songs.delete(id).await
}

pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/count", get(count_route))
        .route("/song", get(list_songs_route).post(create_song_route))
        .route(
            "/song/{id}",
            get(get_song_route)
                .put(update_song_route)
                .delete(delete_song_route),
        )
}
