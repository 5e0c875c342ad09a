//! Exercises the PostgreSQL store against a live server.
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
//! The test recreates the `songs` table in that database.

use serde_json::json;

use song_catalog::db::Database;
use song_catalog::models::{SongDocument, SongId};
use song_catalog::store::{SongStore, StoreError, UpdateOutcome};

fn doc(value: serde_json::Value) -> SongDocument {
    SongDocument::from_object(value).unwrap()
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL pointing at a disposable PostgreSQL database"]
async fn test_postgres_store_round_trip() {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let store = Database::connect(&url).await.expect("Should connect to test database");

    let inserted = store
        .reset(vec![
            doc(json!({"id": 1, "title": "One"})),
            doc(json!({"id": 2, "title": "Two"})),
        ])
        .await
        .unwrap();
    assert_eq!(inserted, 2);
    assert_eq!(store.count().await.unwrap(), 2);

    let ids: Vec<i64> = store
        .list()
        .await
        .unwrap()
        .iter()
        .filter_map(|s| s.id())
        .map(|id| id.0)
        .collect();
    assert_eq!(ids, vec![1, 2]);

    let err = store.insert(doc(json!({"id": 1}))).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(SongId(1))));

    let patch = || doc(json!({"title": "Uno"}));
    match store.update(SongId(1), patch()).await.unwrap() {
        UpdateOutcome::Updated(song) => assert_eq!(song.fields["title"], "Uno"),
        other => panic!("expected update, got {:?}", other),
    }
    assert_eq!(store.update(SongId(1), patch()).await.unwrap(), UpdateOutcome::Unchanged);
    assert_eq!(store.update(SongId(9), patch()).await.unwrap(), UpdateOutcome::NotFound);

    assert!(store.delete(SongId(2)).await.unwrap());
    assert!(!store.delete(SongId(2)).await.unwrap());
    assert!(store.find(SongId(2)).await.unwrap().is_none());
    assert_eq!(store.count().await.unwrap(), 1);
}
