pub mod object_id;
pub mod song;

pub use object_id::ObjectId;
pub use song::{DocumentError, Fields, Song, SongDocument, SongId};
