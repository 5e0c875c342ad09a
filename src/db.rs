use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};
use tracing::{debug, info};

use crate::models::{Fields, ObjectId, Song, SongDocument, SongId};
use crate::store::{SongStore, StoreError, UpdateOutcome};

/// SQLSTATE codes PostgreSQL reports for rejected credentials.
const AUTH_FAILURE_CODES: &[&str] = &["28P01", "28000"];

/// PostgreSQL-backed `songs` collection, one JSONB document per row.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

#[derive(FromRow)]
struct SongRow {
    oid: String,
    doc: Json<Fields>,
}

impl SongRow {
    fn into_song(self) -> Result<Song, StoreError> {
        let oid = ObjectId::parse_hex(&self.oid).ok_or_else(|| {
            sqlx::Error::Decode(format!("invalid object id in songs table: {}", self.oid).into())
        })?;
        Ok(Song::new(oid, self.doc.0))
    }
}

/// Whether `err` means the server refused our credentials.
pub fn is_auth_failure(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| AUTH_FAILURE_CODES.iter().any(|c| *c == code)),
        _ => false,
    }
}

fn map_unique_violation(err: sqlx::Error, id: SongId) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Duplicate(id),
        _ => StoreError::Database(err),
    }
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SongStore for Database {
    async fn reset(&self, seed: Vec<SongDocument>) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DROP TABLE IF EXISTS songs")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "CREATE TABLE songs (
                seq BIGSERIAL PRIMARY KEY,
                oid TEXT NOT NULL UNIQUE,
                doc JSONB NOT NULL
            )",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("CREATE UNIQUE INDEX songs_external_id ON songs ((doc -> 'id'))")
            .execute(&mut *tx)
            .await?;

        let total = seed.len();
        for doc in seed {
            let id = doc.id().unwrap_or(SongId(0));
            sqlx::query("INSERT INTO songs (oid, doc) VALUES ($1, $2)")
                .bind(ObjectId::new().to_hex())
                .bind(Json(doc.into_fields()))
                .execute(&mut *tx)
                .await
                .map_err(|e| map_unique_violation(e, id))?;
        }

        tx.commit().await?;
        info!("songs collection recreated with {} documents", total);
        Ok(total)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn list(&self) -> Result<Vec<Song>, StoreError> {
        sqlx::query_as::<_, SongRow>("SELECT oid, doc FROM songs ORDER BY seq")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(SongRow::into_song)
            .collect()
    }

    async fn find(&self, id: SongId) -> Result<Option<Song>, StoreError> {
        sqlx::query_as::<_, SongRow>(
            "SELECT oid, doc FROM songs WHERE doc -> 'id' = to_jsonb($1::bigint) ORDER BY seq LIMIT 1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?
        .map(SongRow::into_song)
        .transpose()
    }

    async fn insert(&self, doc: SongDocument) -> Result<ObjectId, StoreError> {
        let oid = ObjectId::new();
        let id = doc.id().unwrap_or(SongId(0));
        sqlx::query("INSERT INTO songs (oid, doc) VALUES ($1, $2)")
            .bind(oid.to_hex())
            .bind(Json(doc.into_fields()))
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, id))?;
        debug!("inserted song {} as {}", id, oid);
        Ok(oid)
    }

    async fn update(&self, id: SongId, patch: SongDocument) -> Result<UpdateOutcome, StoreError> {
        let Some(current) = self.find(id).await? else {
            return Ok(UpdateOutcome::NotFound);
        };

        let target = patch.id().unwrap_or(id);
        let row = sqlx::query_as::<_, SongRow>(
            "UPDATE songs SET doc = doc || $2::jsonb
             WHERE oid = $1 AND doc || $2::jsonb IS DISTINCT FROM doc
             RETURNING oid, doc",
        )
        .bind(current.oid.to_hex())
        .bind(Json(patch.into_fields()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, target))?;

        match row {
            Some(row) => Ok(UpdateOutcome::Updated(row.into_song()?)),
            None => Ok(UpdateOutcome::Unchanged),
        }
    }

    async fn delete(&self, id: SongId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM songs WHERE seq = (
                SELECT seq FROM songs WHERE doc -> 'id' = to_jsonb($1::bigint) ORDER BY seq LIMIT 1
            )",
        )
        .bind(id.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
