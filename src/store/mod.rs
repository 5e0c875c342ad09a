pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ObjectId, Song, SongDocument, SongId};

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another document already carries this external id.
    #[error("song with id {0} already present")]
    Duplicate(SongId),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of merging a patch into a stored song.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    NotFound,
    /// The song exists but the patch left every field as it was.
    Unchanged,
    Updated(Song),
}

/// The `songs` collection.
///
/// Lookups by [`SongId`] act on the first matching document in natural
/// storage order.
#[async_trait]
pub trait SongStore: Send + Sync {
    /// Drops the collection, recreates it and inserts `seed` as one batch.
    async fn reset(&self, seed: Vec<SongDocument>) -> Result<usize, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn list(&self) -> Result<Vec<Song>, StoreError>;

    async fn find(&self, id: SongId) -> Result<Option<Song>, StoreError>;

    async fn insert(&self, doc: SongDocument) -> Result<ObjectId, StoreError>;

    /// Shallow merge of `patch` into the song with `id`.
    async fn update(&self, id: SongId, patch: SongDocument) -> Result<UpdateOutcome, StoreError>;

    /// Returns whether a document was removed.
    async fn delete(&self, id: SongId) -> Result<bool, StoreError>;
}
