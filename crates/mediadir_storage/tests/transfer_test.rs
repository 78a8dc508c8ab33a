//! Tests for stream transfer between records and private files.

use mediadir_core::{MediaCategory, MediaDirConfig};
use mediadir_storage::{ContentRecordStore, InMemoryProvider, StoreErrorKind, StreamTransfer};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

fn transfer_with(provider: &Arc<InMemoryProvider>) -> StreamTransfer {
    StreamTransfer::new(ContentRecordStore::new(provider.clone()))
}

/// Yields some bytes, then fails.
struct FailingReader {
    remaining: usize,
}

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.remaining == 0 {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "source gone")));
        }
        let n = this.remaining.min(buf.remaining());
        buf.put_slice(&vec![7u8; n]);
        this.remaining -= n;
        Poll::Ready(Ok(()))
    }
}

/// Accepts writes, fails to shut down, and records that it was closed.
struct StubbornWriter {
    closed: Arc<AtomicBool>,
}

impl AsyncWrite for StubbornWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::other("close failed")))
    }
}

impl Drop for StubbornWriter {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_copy_counts_every_byte() {
    let provider = Arc::new(InMemoryProvider::default());
    let transfer = transfer_with(&provider).with_buffer_size(1024);

    let data = vec![42u8; 12_345];
    let mut destination = Vec::new();
    let copied = transfer.copy(&data[..], &mut destination).await.unwrap();

    assert_eq!(copied, 12_345);
    assert_eq!(destination, data);
}

#[tokio::test]
async fn test_copy_failure_reports_read_error_and_releases_destination() {
    let provider = Arc::new(InMemoryProvider::default());
    let transfer = transfer_with(&provider);
    let closed = Arc::new(AtomicBool::new(false));

    let err = transfer
        .copy(
            FailingReader { remaining: 100 },
            StubbornWriter {
                closed: closed.clone(),
            },
        )
        .await
        .unwrap_err();

    // The read error wins over the shutdown error raised during cleanup.
    match err.store_kind() {
        Some(StoreErrorKind::Io(message)) => assert!(message.contains("source gone")),
        other => panic!("expected Io, got {:?}", other),
    }
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_shutdown_failure_after_clean_copy_is_reported() {
    let provider = Arc::new(InMemoryProvider::default());
    let transfer = transfer_with(&provider);
    let closed = Arc::new(AtomicBool::new(false));

    let err = transfer
        .copy(
            &b"abc"[..],
            StubbornWriter {
                closed: closed.clone(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err.store_kind(), Some(StoreErrorKind::Io(_))));
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_export_to_private_file_creates_parents() {
    let provider = Arc::new(InMemoryProvider::default());
    let transfer = transfer_with(&provider);
    let temp_dir = TempDir::new().unwrap();

    let uri = transfer
        .save_stream_to_category(MediaCategory::Music, &b"ID3"[..], "song.mp3", Some("album"))
        .await
        .unwrap();

    let destination = temp_dir.path().join("nested/deeper/song.mp3");
    let copied = transfer
        .copy_category_file_to_private(&uri, &destination)
        .await
        .unwrap();

    assert_eq!(copied, 3);
    assert_eq!(std::fs::read(&destination).unwrap(), b"ID3");
    assert_eq!(provider.open_handles(), 0);
}

#[tokio::test]
async fn test_export_of_missing_record_is_not_found() {
    let provider = Arc::new(InMemoryProvider::default());
    let transfer = transfer_with(&provider);
    let temp_dir = TempDir::new().unwrap();
    let uri = transfer.store().uri_for_id(MediaCategory::Music, 404);

    let destination = temp_dir.path().join("out/song.mp3");
    let err = transfer
        .copy_category_file_to_private(&uri, &destination)
        .await
        .unwrap_err();

    assert!(matches!(err.store_kind(), Some(StoreErrorKind::NotFound(_))));
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_import_private_file() {
    let provider = Arc::new(InMemoryProvider::default());
    let transfer = transfer_with(&provider);
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("q1.pdf");
    std::fs::write(&file, b"%PDF-1.7").unwrap();

    let uri = transfer
        .copy_private_file_to_category(MediaCategory::Documents, &file, Some("reports"))
        .await
        .unwrap();

    assert_eq!(provider.contents(&uri).unwrap().unwrap(), b"%PDF-1.7");
    let record = transfer.store().get(&uri).await.unwrap().unwrap();
    assert_eq!(record.display_name(), "q1.pdf");
    assert_eq!(record.relative_path(), "Documents/reports");
    assert_eq!(*record.size(), 8);
}

#[tokio::test]
async fn test_import_of_missing_file_inserts_nothing() {
    let provider = Arc::new(InMemoryProvider::default());
    let transfer = transfer_with(&provider);
    let temp_dir = TempDir::new().unwrap();

    let err = transfer
        .copy_private_file_to_category(
            MediaCategory::Documents,
            temp_dir.path().join("absent.pdf"),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err.store_kind(),
        Some(StoreErrorKind::InvalidArgument(_))
    ));
    let records = transfer
        .store()
        .query_all(MediaCategory::Documents, None, None)
        .collect()
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_failed_fill_removes_record() {
    let provider = Arc::new(InMemoryProvider::default());
    let transfer = transfer_with(&provider);

    let err = transfer
        .save_stream_to_category(
            MediaCategory::Documents,
            FailingReader { remaining: 10 },
            "broken.txt",
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err.store_kind(), Some(StoreErrorKind::Io(_))));

    let found = transfer
        .store()
        .find_by_display_name(MediaCategory::Documents, "broken.txt", None)
        .await
        .unwrap();
    assert_eq!(found, None);
    assert_eq!(provider.open_handles(), 0);
}

#[tokio::test]
async fn test_create_empty() {
    let provider = Arc::new(InMemoryProvider::default());
    let transfer = transfer_with(&provider);

    let uri = transfer
        .create_empty(MediaCategory::Downloads, "placeholder.bin", None)
        .await
        .unwrap();

    assert!(transfer.store().exists(&uri).await);
    assert!(transfer.read_to_vec(&uri).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_buffer_size_from_config() {
    let provider = Arc::new(InMemoryProvider::default());
    let config = MediaDirConfig::default().with_buffer_size(1024usize);
    let transfer =
        StreamTransfer::from_config(ContentRecordStore::new(provider.clone()), &config);

    let data = vec![1u8; 4096 + 17];
    let uri = transfer
        .save_stream_to_category(MediaCategory::Documents, &data[..], "blob.bin", None)
        .await
        .unwrap();
    assert_eq!(transfer.read_to_vec(&uri).await.unwrap(), data);
}
