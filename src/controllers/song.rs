use std::sync::Arc;

use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::models::{DocumentError, SongDocument, SongId};
use crate::store::{SongStore, UpdateOutcome};

/// CRUD over the songs collection. Each call is one or two store operations.
#[derive(Clone)]
pub struct SongController {
    store: Arc<dyn SongStore>,
}

impl SongController {
    pub fn new(store: Arc<dyn SongStore>) -> Self {
        SongController { store }
    }

    pub async fn count(&self) -> Result<Response, ApiError> {
        let count = self.store.count().await?;
        Ok(Json(json!({ "count": count })).into_response())
    }

    pub async fn list(&self) -> Result<Response, ApiError> {
        let songs = self.store.list().await?;
        Ok(Json(json!({ "songs": songs })).into_response())
    }

    pub async fn get(&self, id: SongId) -> Result<Response, ApiError> {
        match self.store.find(id).await? {
            Some(song) => Ok(Json(song).into_response()),
            None => Err(ApiError::NotFound("song with id not found")),
        }
    }

    /// Existence is checked first; the store also rejects a duplicate that
    /// slips in between the check and the insert.
    pub async fn create(&self, body: Value) -> Result<Response, ApiError> {
        let doc = SongDocument::with_id(body)?;
        let id = doc
            .id()
            .ok_or_else(|| ApiError::from(DocumentError::MissingId))?;

        if self.store.find(id).await?.is_some() {
            debug!("create rejected, song {} exists", id);
            return Err(ApiError::AlreadyPresent(id));
        }

        let oid = self.store.insert(doc).await?;
        info!("created song {} ({})", id, oid);
        Ok((StatusCode::CREATED, Json(json!({ "inserted id": oid }))).into_response())
    }

    pub async fn update(&self, id: SongId, body: Value) -> Result<Response, ApiError> {
        let patch = SongDocument::patch(body)?;

        match self.store.update(id, patch).await? {
            UpdateOutcome::Updated(song) => {
                info!("updated song {}", id);
                Ok(Json(song).into_response())
            }
            UpdateOutcome::Unchanged => {
                Ok(Json(json!({ "message": "song found, but nothing updated" })).into_response())
            }
            UpdateOutcome::NotFound => Err(ApiError::NotFound("song not found")),
        }
    }

    pub async fn delete(&self, id: SongId) -> Result<Response, ApiError> {
        if self.store.delete(id).await? {
            info!("deleted song {}", id);
            Ok(StatusCode::NO_CONTENT.into_response())
        } else {
            Err(ApiError::NotFound("song not found"))
        }
    }
}
