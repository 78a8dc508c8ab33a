//! Tests for category-scoped record operations.

use futures::StreamExt;
use mediadir_core::{
    CollectionAddress, Column, ContentUri, MediaCategory, RecordValues, SortDirection, SortOrder,
    StorageMode,
};
use mediadir_error::MediaDirResult;
use mediadir_storage::{
    ContentProvider, ContentRecordStore, InMemoryProvider, ReadStream, Row, RowCursor, Selection,
    StoreErrorKind, StreamTransfer, VecCursor, WriteStream,
};
use std::sync::Arc;

fn store_with(provider: &Arc<InMemoryProvider>) -> ContentRecordStore {
    ContentRecordStore::new(provider.clone())
}

#[tokio::test]
async fn test_placeholder_round_trip() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);

    let uri = store
        .insert_placeholder(MediaCategory::Documents, "q1.pdf", Some("reports"))
        .await
        .unwrap();

    let found = store
        .find_by_display_name(MediaCategory::Documents, "q1.pdf", Some("reports"))
        .await
        .unwrap();
    assert_eq!(found, Some(uri));

    let records = store
        .query_all(MediaCategory::Documents, Some("reports"), None)
        .collect()
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(*record.id(), uri.id());
    assert_eq!(record.display_name(), "q1.pdf");
    assert_eq!(record.mime_type(), "application/pdf");
    assert_eq!(record.relative_path(), "Documents/reports");
    assert_eq!(record.title().as_deref(), Some("q1"));
    assert_eq!(record.bucket().as_deref(), Some("reports"));
    assert!(!record.is_pending());
}

#[tokio::test]
async fn test_newest_duplicate_wins() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);

    let older = store
        .insert_placeholder(MediaCategory::Pictures, "cat.png", Some("pets"))
        .await
        .unwrap();
    let newer = store
        .insert_placeholder(MediaCategory::Pictures, "cat.png", Some("pets"))
        .await
        .unwrap();
    assert!(newer.id() > older.id());

    let found = store
        .find_by_display_name(MediaCategory::Pictures, "cat.png", Some("pets"))
        .await
        .unwrap();
    assert_eq!(found, Some(newer));
}

#[tokio::test]
async fn test_lookup_absence_is_not_an_error() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);

    let found = store
        .find_by_display_name(MediaCategory::Music, "missing.mp3", None)
        .await
        .unwrap();
    assert_eq!(found, None);

    let records = store
        .query_all(MediaCategory::Music, None, None)
        .collect()
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_hostile_display_name_matches_literally() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);

    store
        .insert_placeholder(MediaCategory::Documents, "a.txt", None)
        .await
        .unwrap();

    let found = store
        .find_by_display_name(MediaCategory::Documents, "x' OR '1'='1", None)
        .await
        .unwrap();
    assert_eq!(found, None);
}

#[tokio::test]
async fn test_sub_path_wildcards_match_literally() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);

    store
        .insert_placeholder(MediaCategory::Documents, "a.txt", Some("100x done"))
        .await
        .unwrap();

    let records = store
        .query_all(MediaCategory::Documents, Some("100_done"), None)
        .collect()
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_query_is_restartable_and_sees_new_state() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);
    let query = store.query_all(MediaCategory::Documents, None, None);

    store
        .insert_placeholder(MediaCategory::Documents, "one.txt", None)
        .await
        .unwrap();
    assert_eq!(query.collect().await.unwrap().len(), 1);

    store
        .insert_placeholder(MediaCategory::Documents, "two.txt", None)
        .await
        .unwrap();
    let names: Vec<String> = query
        .collect()
        .await
        .unwrap()
        .iter()
        .map(|r| r.display_name().clone())
        .collect();
    assert_eq!(names, vec!["two.txt", "one.txt"]);
}

#[tokio::test]
async fn test_query_runs_only_when_polled_and_releases_cursor() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);
    for name in ["a.txt", "b.txt", "c.txt"] {
        store
            .insert_placeholder(MediaCategory::Documents, name, None)
            .await
            .unwrap();
    }

    let query = store.query_all(MediaCategory::Documents, None, None);
    let mut stream = query.stream();
    assert_eq!(provider.open_handles(), 0);

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.display_name(), "c.txt");
    assert_eq!(provider.open_handles(), 1);

    drop(stream);
    assert_eq!(provider.open_handles(), 0);

    let all = query.collect().await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(provider.open_handles(), 0);
}

#[tokio::test]
async fn test_sort_override() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);
    for name in ["b.txt", "a.txt", "c.txt"] {
        store
            .insert_placeholder(MediaCategory::Documents, name, None)
            .await
            .unwrap();
    }

    let sort = SortOrder::new(Column::DisplayName, SortDirection::Ascending);
    let names: Vec<String> = store
        .query_all(MediaCategory::Documents, None, Some(sort))
        .collect()
        .await
        .unwrap()
        .iter()
        .map(|r| r.display_name().clone())
        .collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
}

#[tokio::test]
async fn test_resolve_real_path_depends_on_mode() {
    let scoped = Arc::new(InMemoryProvider::new(StorageMode::Scoped));
    let store = store_with(&scoped);
    store
        .insert_placeholder(MediaCategory::Camera, "IMG_1.jpg", Some("trip"))
        .await
        .unwrap();
    let path = store
        .resolve_real_path(MediaCategory::Camera, "IMG_1.jpg", Some("trip"))
        .await
        .unwrap();
    assert_eq!(path, None);

    let legacy = Arc::new(InMemoryProvider::new(StorageMode::Legacy));
    let store = store_with(&legacy);
    store
        .insert_placeholder(MediaCategory::Camera, "IMG_1.jpg", Some("trip"))
        .await
        .unwrap();
    let path = store
        .resolve_real_path(MediaCategory::Camera, "IMG_1.jpg", Some("trip"))
        .await
        .unwrap();
    assert_eq!(path.as_deref(), Some("/storage/emulated/0/DCIM/trip/IMG_1.jpg"));
}

#[tokio::test]
async fn test_exists_means_openable() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);
    let uri = store
        .insert_placeholder(MediaCategory::Documents, "empty.txt", None)
        .await
        .unwrap();

    assert!(store.exists(&uri).await);
    assert_eq!(provider.open_handles(), 0);

    provider.mark_unreadable(&uri).unwrap();
    assert!(!store.exists(&uri).await);
    assert!(store.get(&uri).await.unwrap().is_some());

    let missing = ContentUri::new(CollectionAddress::Files, 999);
    assert!(!store.exists(&missing).await);
}

#[tokio::test]
async fn test_empty_display_name_is_invalid() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);
    let err = store
        .insert_placeholder(MediaCategory::Documents, "", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(StoreErrorKind::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_empty_display_name_lookups_are_invalid() {
    let provider = Arc::new(InMemoryProvider::new(StorageMode::Legacy));
    let store = store_with(&provider);
    store
        .insert_placeholder(MediaCategory::Documents, "q1.pdf", None)
        .await
        .unwrap();

    let err = store
        .find_by_display_name(MediaCategory::Documents, "", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(StoreErrorKind::InvalidArgument(_))
    ));

    let err = store
        .resolve_real_path(MediaCategory::Documents, "", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(StoreErrorKind::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_store_rejection_is_insert_denied() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);

    // An unknown suffix infers application/octet-stream, which the image
    // collection refuses.
    let err = store
        .insert_placeholder(MediaCategory::Pictures, "scan.xyz", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(StoreErrorKind::InsertDenied(_))
    ));

    let err = store
        .insert_placeholder(MediaCategory::Documents, "a/b.txt", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(StoreErrorKind::InsertDenied(_))
    ));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);
    let uri = store
        .insert_placeholder(MediaCategory::Downloads, "setup.zip", None)
        .await
        .unwrap();

    assert_eq!(store.delete(&uri).await.unwrap(), 1);
    assert_eq!(store.delete(&uri).await.unwrap(), 0);
    assert!(!store.exists(&uri).await);

    let next = store
        .insert_placeholder(MediaCategory::Downloads, "setup.zip", None)
        .await
        .unwrap();
    assert!(next.id() > uri.id());
}

#[tokio::test]
async fn test_update_renames() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);
    let uri = store
        .insert_placeholder(MediaCategory::Music, "track.mp3", Some("album"))
        .await
        .unwrap();

    let rows = store
        .update(&uri, &RecordValues::default().with_display_name("intro.mp3"))
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let record = store.get(&uri).await.unwrap().unwrap();
    assert_eq!(record.display_name(), "intro.mp3");
}

#[tokio::test]
async fn test_uri_for_id() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);
    let uri = store.uri_for_id(MediaCategory::Movies, 12);
    assert_eq!(uri.to_string(), "content://media/external/video/media/12");
}

#[tokio::test]
async fn test_staged_save_is_visible_after_fill() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = store_with(&provider);
    let transfer = StreamTransfer::new(store.clone());

    let uri = transfer
        .save_staged(MediaCategory::Documents, &b"draft"[..], "notes.txt", None)
        .await
        .unwrap();

    let visible = store
        .query_all(MediaCategory::Documents, None, None)
        .visible_only()
        .collect()
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(*visible[0].id(), uri.id());
    assert_eq!(*visible[0].size(), 5);
}

/// Provider whose rows and mutation counts are scripted.
struct ScriptedProvider {
    rows: Vec<Row>,
    affected: u64,
}

#[async_trait::async_trait]
impl ContentProvider for ScriptedProvider {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Scoped
    }

    async fn insert(
        &self,
        address: CollectionAddress,
        _values: &RecordValues,
    ) -> MediaDirResult<ContentUri> {
        Ok(ContentUri::new(address, 1))
    }

    async fn query(
        &self,
        _address: CollectionAddress,
        _projection: &[Column],
        _selection: &Selection,
        _sort: &SortOrder,
    ) -> MediaDirResult<Box<dyn RowCursor>> {
        Ok(Box::new(VecCursor::new(self.rows.clone())))
    }

    async fn update(&self, _uri: &ContentUri, _values: &RecordValues) -> MediaDirResult<u64> {
        Ok(self.affected)
    }

    async fn delete(&self, _uri: &ContentUri) -> MediaDirResult<u64> {
        Ok(self.affected)
    }

    async fn open_read(&self, _uri: &ContentUri) -> MediaDirResult<ReadStream> {
        Ok(Box::new(tokio::io::empty()))
    }

    async fn open_write(&self, _uri: &ContentUri) -> MediaDirResult<WriteStream> {
        Ok(Box::new(tokio::io::sink()))
    }
}

#[tokio::test]
async fn test_multi_row_mutation_is_integrity_violation() {
    let store = ContentRecordStore::new(Arc::new(ScriptedProvider {
        rows: Vec::new(),
        affected: 2,
    }));
    let uri = ContentUri::new(CollectionAddress::Files, 1);

    let err = store.delete(&uri).await.unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(StoreErrorKind::IntegrityViolation(_))
    ));

    let err = store
        .update(&uri, &RecordValues::default().with_pending(true))
        .await
        .unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(StoreErrorKind::IntegrityViolation(_))
    ));
}

#[tokio::test]
async fn test_row_missing_a_column_fails_decoding() {
    let row = Row::new()
        .with(Column::Id, 4i64)
        .with(Column::DisplayName, "q1.pdf".to_string());
    let store = ContentRecordStore::new(Arc::new(ScriptedProvider {
        rows: vec![row],
        affected: 1,
    }));

    let err = store
        .query_all(MediaCategory::Documents, None, None)
        .collect()
        .await
        .unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(StoreErrorKind::MalformedRecord(_))
    ));
}

#[tokio::test]
async fn test_negative_size_fails_decoding() {
    let row = Row::new()
        .with(Column::Id, 4i64)
        .with(Column::Title, "q1".to_string())
        .with(Column::DataPath, None::<String>)
        .with(Column::MimeType, "application/pdf".to_string())
        .with(Column::DisplayName, "q1.pdf".to_string())
        .with(Column::Size, -1i64)
        .with(Column::RelativePath, "Documents".to_string())
        .with(Column::Bucket, "Documents".to_string())
        .with(Column::DateModified, 0i64)
        .with(Column::Duration, 0i64)
        .with(Column::IsPending, 0i64);
    let store = ContentRecordStore::new(Arc::new(ScriptedProvider {
        rows: vec![row],
        affected: 1,
    }));

    let err = store
        .query_all(MediaCategory::Documents, None, None)
        .collect()
        .await
        .unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(StoreErrorKind::MalformedRecord(_))
    ));
}
