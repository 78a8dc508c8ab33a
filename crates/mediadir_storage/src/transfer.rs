//! Byte transfer between record streams and private files.

use crate::{ContentRecordStore, VisibilityGate};
use mediadir_core::{ContentUri, MediaCategory, MediaDirConfig};
use mediadir_error::{MediaDirResult, StoreError, StoreErrorKind};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

/// Default size of the intermediate copy buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

fn io_failure(context: &str, e: std::io::Error) -> StoreError {
    StoreError::new(StoreErrorKind::Io(format!("{}: {}", context, e)))
}

/// Copies bytes between record streams and private files.
///
/// Every copy owns both of its streams and releases them on every path.
/// When a copy fails, the copy error is reported and any error raised while
/// closing the destination is only logged.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use mediadir_core::MediaCategory;
/// use mediadir_storage::{ContentRecordStore, InMemoryProvider, StreamTransfer};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = ContentRecordStore::new(Arc::new(InMemoryProvider::default()));
/// let transfer = StreamTransfer::new(store);
///
/// let uri = transfer
///     .save_stream_to_category(MediaCategory::Documents, &b"hello"[..], "hello.txt", None)
///     .await?;
/// assert_eq!(transfer.read_to_vec(&uri).await?, b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StreamTransfer {
    store: ContentRecordStore,
    buffer_size: usize,
}

impl StreamTransfer {
    /// Transfer over `store` with the default buffer size.
    pub fn new(store: ContentRecordStore) -> Self {
        Self {
            store,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Transfer over `store` using the configured buffer size.
    pub fn from_config(store: ContentRecordStore, config: &MediaDirConfig) -> Self {
        Self::new(store).with_buffer_size(*config.buffer_size())
    }

    /// Use a different copy buffer size. Zero is treated as one byte.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// The record store transfers go through.
    pub fn store(&self) -> &ContentRecordStore {
        &self.store
    }

    /// Copy every byte of `source` into `destination`, returning the count.
    ///
    /// The destination is flushed and shut down before returning. Both
    /// streams are dropped before this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns `Io` if a read, write or flush fails.
    #[instrument(skip(self, source, destination), fields(buffer_size = self.buffer_size))]
    pub async fn copy<R, W>(&self, mut source: R, mut destination: W) -> MediaDirResult<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.pump(&mut source, &mut destination).await;
        drop(source);
        match result {
            Ok(copied) => {
                destination
                    .shutdown()
                    .await
                    .map_err(|e| io_failure("close destination", e))?;
                debug!(copied, "Copy complete");
                Ok(copied)
            }
            Err(e) => {
                if let Err(cleanup) = destination.shutdown().await {
                    warn!(error = %cleanup, "Failed to close destination after copy error");
                }
                Err(e.into())
            }
        }
    }

    async fn pump<R, W>(&self, source: &mut R, destination: &mut W) -> Result<u64, StoreError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buffer = vec![0u8; self.buffer_size];
        let mut copied = 0u64;
        loop {
            let n = source
                .read(&mut buffer)
                .await
                .map_err(|e| io_failure("read source", e))?;
            if n == 0 {
                break;
            }
            destination
                .write_all(&buffer[..n])
                .await
                .map_err(|e| io_failure("write destination", e))?;
            copied += n as u64;
        }
        destination
            .flush()
            .await
            .map_err(|e| io_failure("flush destination", e))?;
        Ok(copied)
    }

    /// Copy a record's bytes into a private file, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record's bytes cannot be opened and
    /// `DirectoryCreation` if the destination directory cannot be made.
    #[instrument(skip(self, destination), fields(uri = %uri, destination = %destination.as_ref().display()))]
    pub async fn copy_category_file_to_private(
        &self,
        uri: &ContentUri,
        destination: impl AsRef<Path>,
    ) -> MediaDirResult<u64> {
        let destination = destination.as_ref();
        if !self.store.exists(uri).await {
            return Err(StoreError::new(StoreErrorKind::NotFound(uri.to_string())).into());
        }
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::new(StoreErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let source = self.store.provider().open_read(uri).await?;
        let file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| io_failure(&destination.display().to_string(), e))?;
        let copied = self.copy(source, file).await?;
        info!(copied, "Exported record to private file");
        Ok(copied)
    }

    /// Copy a private file into a new record under the category sub-path.
    ///
    /// The record is named after the file. The file is opened before the
    /// record is inserted, so a missing file leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `file` is not a readable regular file.
    #[instrument(skip(self, file), fields(file = %file.as_ref().display()))]
    pub async fn copy_private_file_to_category(
        &self,
        category: MediaCategory,
        file: impl AsRef<Path>,
        sub_path: Option<&str>,
    ) -> MediaDirResult<ContentUri> {
        let file = file.as_ref();
        let invalid = |reason: String| StoreError::new(StoreErrorKind::InvalidArgument(reason));

        let metadata = tokio::fs::metadata(file)
            .await
            .map_err(|e| invalid(format!("{}: {}", file.display(), e)))?;
        if !metadata.is_file() {
            return Err(invalid(format!("{} is not a regular file", file.display())).into());
        }
        let display_name = file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| invalid(format!("{} has no file name", file.display())))?;
        let source = tokio::fs::File::open(file)
            .await
            .map_err(|e| invalid(format!("{}: {}", file.display(), e)))?;

        self.save_stream_to_category(category, source, &display_name, sub_path)
            .await
    }

    /// Insert a visible record and fill it from `source`.
    ///
    /// If the copy fails, the new record is deleted again before the copy
    /// error is returned.
    #[instrument(skip(self, source))]
    pub async fn save_stream_to_category<R>(
        &self,
        category: MediaCategory,
        source: R,
        display_name: &str,
        sub_path: Option<&str>,
    ) -> MediaDirResult<ContentUri>
    where
        R: AsyncRead + Unpin,
    {
        let uri = self
            .store
            .insert_placeholder(category, display_name, sub_path)
            .await?;
        self.fill(&uri, source).await?;
        Ok(uri)
    }

    /// Insert a hidden record, fill it from `source`, then reveal it.
    ///
    /// Other readers never observe the record half-written.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record vanished before it could be revealed.
    #[instrument(skip(self, source))]
    pub async fn save_staged<R>(
        &self,
        category: MediaCategory,
        source: R,
        display_name: &str,
        sub_path: Option<&str>,
    ) -> MediaDirResult<ContentUri>
    where
        R: AsyncRead + Unpin,
    {
        let uri = self
            .store
            .insert_pending(category, display_name, sub_path)
            .await?;
        self.fill(&uri, source).await?;

        let gate = VisibilityGate::new(self.store.clone());
        if !gate.reveal(&uri).await? {
            return Err(StoreError::new(StoreErrorKind::NotFound(format!(
                "{} vanished before it could be revealed",
                uri
            )))
            .into());
        }
        Ok(uri)
    }

    async fn fill<R>(&self, uri: &ContentUri, source: R) -> MediaDirResult<u64>
    where
        R: AsyncRead + Unpin,
    {
        let outcome = match self.store.provider().open_write(uri).await {
            Ok(destination) => self.copy(source, destination).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(copied) => {
                info!(%uri, copied, "Filled record");
                Ok(copied)
            }
            Err(e) => {
                if let Err(cleanup) = self.store.delete(uri).await {
                    warn!(%uri, error = %cleanup, "Failed to remove partially written record");
                }
                Err(e)
            }
        }
    }

    /// Insert a visible, empty record and create its backing object.
    #[instrument(skip(self))]
    pub async fn create_empty(
        &self,
        category: MediaCategory,
        display_name: &str,
        sub_path: Option<&str>,
    ) -> MediaDirResult<ContentUri> {
        self.save_stream_to_category(category, tokio::io::empty(), display_name, sub_path)
            .await
    }

    /// Read a record's bytes into memory.
    #[instrument(skip(self), fields(uri = %uri))]
    pub async fn read_to_vec(&self, uri: &ContentUri) -> MediaDirResult<Vec<u8>> {
        let mut source = self.store.provider().open_read(uri).await?;
        let mut bytes = Vec::new();
        source
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| io_failure(&uri.to_string(), e))?;
        Ok(bytes)
    }
}
