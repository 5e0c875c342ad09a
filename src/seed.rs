use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::models::{DocumentError, SongDocument};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("could not read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("seed file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("seed file {path} must hold a JSON array of songs")]
    NotAnArray { path: PathBuf },

    #[error("seed record {index} in {path}: {source}")]
    Record {
        path: PathBuf,
        index: usize,
        source: DocumentError,
    },
}

/// Reads the startup dataset: a JSON array of song objects.
pub fn load_seed(path: &Path) -> Result<Vec<SongDocument>, SeedError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let songs = parse_seed(&raw, path)?;
    info!("loaded {} seed songs from {}", songs.len(), path.display());
    Ok(songs)
}

fn parse_seed(raw: &str, path: &Path) -> Result<Vec<SongDocument>, SeedError> {
    let value: Value = serde_json::from_str(raw).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Array(records) = value else {
        return Err(SeedError::NotAnArray {
            path: path.to_path_buf(),
        });
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            SongDocument::from_object(record).map_err(|source| SeedError::Record {
                path: path.to_path_buf(),
                index,
                source,
            })
        })
        .collect()
}
