use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{ObjectId, Song, SongDocument, SongId};
use crate::store::{SongStore, StoreError, UpdateOutcome};

/// In-process collection with the same semantics as the PostgreSQL store,
/// including rejection of duplicate external ids.
#[derive(Clone, Default)]
pub struct MemoryStore {
    songs: Arc<RwLock<Vec<Song>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn id_taken(songs: &[Song], id: Option<SongId>, except: Option<ObjectId>) -> bool {
    match id {
        Some(id) => songs
            .iter()
            .any(|s| Some(s.oid) != except && s.id() == Some(id)),
        None => false,
    }
}

#[async_trait]
impl SongStore for MemoryStore {
    async fn reset(&self, seed: Vec<SongDocument>) -> Result<usize, StoreError> {
        let mut fresh: Vec<Song> = Vec::with_capacity(seed.len());
        for doc in seed {
            if id_taken(&fresh, doc.id(), None) {
                return Err(StoreError::Duplicate(doc.id().unwrap_or(SongId(0))));
            }
            fresh.push(Song::new(ObjectId::new(), doc.into_fields()));
        }
        let inserted = fresh.len();
        *self.songs.write().await = fresh;
        debug!("memory store reset with {} songs", inserted);
        Ok(inserted)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.songs.read().await.len() as u64)
    }

    async fn list(&self) -> Result<Vec<Song>, StoreError> {
        Ok(self.songs.read().await.clone())
    }

    async fn find(&self, id: SongId) -> Result<Option<Song>, StoreError> {
        let songs = self.songs.read().await;
        Ok(songs.iter().find(|s| id.matches(&s.fields)).cloned())
    }

    async fn insert(&self, doc: SongDocument) -> Result<ObjectId, StoreError> {
        let mut songs = self.songs.write().await;
        if let Some(id) = doc.id() {
            if id_taken(&songs, Some(id), None) {
                return Err(StoreError::Duplicate(id));
            }
        }
        let oid = ObjectId::new();
        songs.push(Song::new(oid, doc.into_fields()));
        Ok(oid)
    }

    async fn update(&self, id: SongId, patch: SongDocument) -> Result<UpdateOutcome, StoreError> {
        let mut songs = self.songs.write().await;
        let Some(index) = songs.iter().position(|s| id.matches(&s.fields)) else {
            return Ok(UpdateOutcome::NotFound);
        };

        let mut merged = songs[index].clone();
        if !merged.merge(patch.fields()) {
            return Ok(UpdateOutcome::Unchanged);
        }
        if id_taken(&songs, merged.id(), Some(merged.oid)) {
            return Err(StoreError::Duplicate(merged.id().unwrap_or(id)));
        }
        songs[index] = merged.clone();
        Ok(UpdateOutcome::Updated(merged))
    }

    async fn delete(&self, id: SongId) -> Result<bool, StoreError> {
        let mut songs = self.songs.write().await;
        match songs.iter().position(|s| id.matches(&s.fields)) {
            Some(index) => {
                songs.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
