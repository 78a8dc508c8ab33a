//! Tests for the pending-flag gate.

use mediadir_core::MediaCategory;
use mediadir_storage::{
    ContentRecordStore, ForeignAccess, InMemoryProvider, StoreErrorKind, VisibilityGate,
};
use std::sync::Arc;

async fn visible_names(store: &ContentRecordStore) -> Vec<String> {
    store
        .query_all(MediaCategory::Documents, None, None)
        .visible_only()
        .collect()
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.display_name().clone())
        .collect()
}

#[tokio::test]
async fn test_hidden_record_skipped_by_visible_queries() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = ContentRecordStore::new(provider.clone());
    let gate = VisibilityGate::new(store.clone());

    let uri = store
        .insert_placeholder(MediaCategory::Documents, "secret.txt", None)
        .await
        .unwrap();
    store
        .insert_placeholder(MediaCategory::Documents, "public.txt", None)
        .await
        .unwrap();

    assert!(gate.hide(&uri).await.unwrap());
    assert_eq!(visible_names(&store).await, vec!["public.txt".to_string()]);

    // Unfiltered queries still see it.
    let hidden = store.get(&uri).await.unwrap().unwrap();
    assert!(hidden.is_pending());

    assert!(gate.reveal(&uri).await.unwrap());
    let mut names = visible_names(&store).await;
    names.sort();
    assert_eq!(names, vec!["public.txt".to_string(), "secret.txt".to_string()]);
}

#[tokio::test]
async fn test_setting_flag_twice_is_idempotent() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = ContentRecordStore::new(provider.clone());
    let gate = VisibilityGate::new(store.clone());
    let uri = store
        .insert_placeholder(MediaCategory::Documents, "twice.txt", None)
        .await
        .unwrap();

    assert!(gate.set_hidden(&uri, true).await.unwrap());
    assert!(gate.set_hidden(&uri, true).await.unwrap());
    assert!(store.get(&uri).await.unwrap().unwrap().is_pending());
}

#[tokio::test]
async fn test_missing_record_reports_false() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = ContentRecordStore::new(provider.clone());
    let gate = VisibilityGate::new(store.clone());
    let uri = store.uri_for_id(MediaCategory::Documents, 99);

    assert!(!gate.hide(&uri).await.unwrap());
}

#[tokio::test]
async fn test_foreign_record_denial_propagates() {
    let provider = Arc::new(InMemoryProvider::default());
    let store = ContentRecordStore::new(provider.clone());
    let gate = VisibilityGate::new(store);
    let uri = provider
        .seed_foreign(
            MediaCategory::Documents,
            "theirs.txt",
            None,
            b"x",
            ForeignAccess::Denied,
        )
        .unwrap();

    let err = gate.hide(&uri).await.unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(StoreErrorKind::PermissionDenied(_))
    ));
}
