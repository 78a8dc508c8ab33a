//! In-process content provider.
//!
//! Keeps metadata and bytes in memory. Besides serving as a lightweight
//! store, it models the parts of a real provider that are hard to reach
//! otherwise: records owned by another process, one-shot grant tokens and
//! open handle accounting.

use crate::index::RecordIndex;
use crate::{ContentProvider, ReadStream, Row, RowCursor, Selection, WriteStream};
use mediadir_core::{
    CollectionAddress, Column, ContentUri, MediaCategory, RecordValues, SortOrder, StorageMode,
};
use mediadir_error::{GrantRequest, MediaDirResult, StoreError, StoreErrorKind};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Volume root reported in path hints under legacy mode.
const VOLUME_ROOT: &str = "/storage/emulated/0";

/// How the provider answers mutations of a record this process does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ForeignAccess {
    /// Deny, but offer a grant request the user can approve
    #[display("recoverable")]
    Recoverable,
    /// Deny outright
    #[display("denied")]
    Denied,
}

#[derive(Debug, Default)]
struct MemoryState {
    index: Option<RecordIndex>,
    contents: HashMap<u64, Vec<u8>>,
    foreign: HashMap<u64, ForeignAccess>,
    unreadable: HashSet<u64>,
    tokens: HashMap<String, u64>,
    granted: HashSet<u64>,
    issued_tokens: u64,
    mutation_attempts: u64,
}

impl MemoryState {
    /// The metadata index, opened on first use.
    fn index(&mut self) -> MediaDirResult<&mut RecordIndex> {
        let index = match self.index.take() {
            Some(index) => index,
            None => RecordIndex::in_memory()?,
        };
        Ok(self.index.insert(index))
    }

    /// Admit one mutation of `id`, consuming a grant if one is held.
    fn check_access(&mut self, uri: &ContentUri, action: &str) -> MediaDirResult<()> {
        let id = uri.id();
        let Some(access) = self.foreign.get(&id).copied() else {
            return Ok(());
        };
        if self.granted.remove(&id) {
            tracing::debug!(%uri, action, "Consumed grant for foreign record");
            return Ok(());
        }
        match access {
            ForeignAccess::Denied => Err(StoreError::new(StoreErrorKind::PermissionDenied(
                format!("{} of {} is not permitted", action, uri),
            ))
            .into()),
            ForeignAccess::Recoverable => {
                self.issued_tokens += 1;
                let token = format!("grant-{}", self.issued_tokens);
                self.tokens.insert(token.clone(), id);
                tracing::debug!(%uri, action, token = %token, "Issued grant request");
                Err(StoreError::new(StoreErrorKind::RecoverablePermissionDenied {
                    reason: format!("{} is owned by another application", uri),
                    grant: GrantRequest::new(token, format!("{} {}", action, uri)),
                })
                .into())
            }
        }
    }
}

/// Counts live cursors and streams.
#[derive(Debug)]
struct HandleGuard {
    open: Arc<AtomicUsize>,
}

impl HandleGuard {
    fn new(open: &Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self { open: open.clone() }
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

struct MemoryCursor {
    rows: std::vec::IntoIter<Row>,
    _guard: HandleGuard,
}

#[async_trait::async_trait]
impl RowCursor for MemoryCursor {
    async fn next_row(&mut self) -> MediaDirResult<Option<Row>> {
        Ok(self.rows.next())
    }
}

struct MemoryReader {
    inner: Cursor<Vec<u8>>,
    _guard: HandleGuard,
}

impl AsyncRead for MemoryReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

/// Buffers written bytes and commits them to the record on flush, shutdown
/// or drop.
struct MemoryWriter {
    uri: ContentUri,
    buffer: Vec<u8>,
    dirty: bool,
    state: Arc<Mutex<MemoryState>>,
    _guard: HandleGuard,
}

impl MemoryWriter {
    fn commit(&mut self) -> std::io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let mut state = self
            .state
            .lock()
            .map_err(|_| std::io::Error::other("provider state lock poisoned"))?;
        let now = chrono::Utc::now().timestamp();
        let size = self.buffer.len() as u64;
        let id = self.uri.id();
        let index = state
            .index()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let present = index
            .get(self.uri.address(), id)
            .map_err(|e| std::io::Error::other(e.to_string()))?
            .is_some();
        if !present {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} was deleted while open for writing", self.uri),
            ));
        }
        index
            .record_stats(&[(id, size, now)])
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        state.contents.insert(id, self.buffer.clone());
        self.dirty = false;
        Ok(())
    }
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        this.buffer.extend_from_slice(buf);
        this.dirty = true;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(self.get_mut().commit())
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(self.get_mut().commit())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        if let Err(e) = self.commit() {
            tracing::warn!(uri = %self.uri, error = %e, "Dropped writer failed to commit");
        }
    }
}

/// Content provider that keeps everything in memory.
///
/// # Example
///
/// ```rust
/// use mediadir_core::{MediaCategory, RecordValues, StorageMode};
/// use mediadir_storage::{ContentProvider, InMemoryProvider};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = InMemoryProvider::new(StorageMode::Scoped);
/// let values = RecordValues::default()
///     .with_display_name("q1.pdf")
///     .with_mime_type("application/pdf")
///     .with_relative_path("Documents");
/// let uri = provider
///     .insert(MediaCategory::Documents.collection_address(), &values)
///     .await?;
/// assert_eq!(uri.id(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    mode: StorageMode,
    state: Arc<Mutex<MemoryState>>,
    open: Arc<AtomicUsize>,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(StorageMode::default())
    }
}

impl InMemoryProvider {
    /// Empty provider in the given mode.
    pub fn new(mode: StorageMode) -> Self {
        Self {
            mode,
            state: Arc::new(Mutex::new(MemoryState::default())),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn state(&self) -> MediaDirResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| {
            StoreError::new(StoreErrorKind::Io(
                "provider state lock poisoned".to_string(),
            ))
            .into()
        })
    }

    fn data_path(&self, relative_path: &str, display_name: &str) -> Option<String> {
        self.mode
            .exposes_paths()
            .then(|| format!("{}/{}/{}", VOLUME_ROOT, relative_path, display_name))
    }

    /// Add a record owned by another application, with its bytes.
    ///
    /// Mutations of the record are answered according to `access` until the
    /// user approves a grant for it.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn seed_foreign(
        &self,
        category: MediaCategory,
        display_name: &str,
        sub_path: Option<&str>,
        bytes: &[u8],
        access: ForeignAccess,
    ) -> MediaDirResult<ContentUri> {
        let location = category.locate(sub_path);
        let values = RecordValues::default()
            .with_display_name(display_name)
            .with_mime_type(category.mime_type_for(display_name))
            .with_relative_path(location.relative_path().clone());
        let now = chrono::Utc::now().timestamp();
        let mut state = self.state()?;
        let index = state.index()?;
        let id = index.insert(*location.address(), &values, now)?;
        index.record_stats(&[(id, bytes.len() as u64, now)])?;
        state.contents.insert(id, bytes.to_vec());
        state.foreign.insert(id, access);
        Ok(ContentUri::new(*location.address(), id))
    }

    /// Approve a grant request, as the user would.
    ///
    /// The grant admits exactly one further mutation of the record. Returns
    /// `false` if the token is unknown or was already used.
    pub fn approve(&self, token: &str) -> MediaDirResult<bool> {
        let mut state = self.state()?;
        match state.tokens.remove(token) {
            Some(id) => {
                state.granted.insert(id);
                tracing::info!(token, id, "Grant approved");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Keep the metadata row but make its bytes unopenable.
    pub fn mark_unreadable(&self, uri: &ContentUri) -> MediaDirResult<()> {
        self.state()?.unreadable.insert(uri.id());
        Ok(())
    }

    /// Committed bytes of a record.
    pub fn contents(&self, uri: &ContentUri) -> MediaDirResult<Option<Vec<u8>>> {
        Ok(self.state()?.contents.get(&uri.id()).cloned())
    }

    /// Number of cursors and streams currently open.
    pub fn open_handles(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Number of update and delete calls received.
    pub fn mutation_attempts(&self) -> MediaDirResult<u64> {
        Ok(self.state()?.mutation_attempts)
    }
}

#[async_trait::async_trait]
impl ContentProvider for InMemoryProvider {
    fn storage_mode(&self) -> StorageMode {
        self.mode
    }

    #[tracing::instrument(skip(self, values), fields(address = %address))]
    async fn insert(
        &self,
        address: CollectionAddress,
        values: &RecordValues,
    ) -> MediaDirResult<ContentUri> {
        let mut state = self.state()?;
        let id = state
            .index()?
            .insert(address, values, chrono::Utc::now().timestamp())?;
        state.contents.insert(id, Vec::new());
        tracing::debug!(id, "Inserted record");
        Ok(ContentUri::new(address, id))
    }

    #[tracing::instrument(skip(self, projection, selection, sort), fields(address = %address, selection = %selection))]
    async fn query(
        &self,
        address: CollectionAddress,
        projection: &[Column],
        selection: &Selection,
        sort: &SortOrder,
    ) -> MediaDirResult<Box<dyn RowCursor>> {
        let records = self.state()?.index()?.select(address, selection, sort)?;
        let rows: Vec<Row> = records
            .iter()
            .map(|record| {
                record.row(
                    projection,
                    self.data_path(&record.relative_path, &record.display_name),
                )
            })
            .collect();
        tracing::debug!(count = rows.len(), "Query matched");
        Ok(Box::new(MemoryCursor {
            rows: rows.into_iter(),
            _guard: HandleGuard::new(&self.open),
        }))
    }

    #[tracing::instrument(skip(self, values), fields(uri = %uri))]
    async fn update(&self, uri: &ContentUri, values: &RecordValues) -> MediaDirResult<u64> {
        let mut state = self.state()?;
        state.mutation_attempts += 1;
        if state.index()?.get(uri.address(), uri.id())?.is_none() {
            return Ok(0);
        }
        state.check_access(uri, "update")?;
        state.index()?.apply(uri.address(), uri.id(), values)
    }

    #[tracing::instrument(skip(self), fields(uri = %uri))]
    async fn delete(&self, uri: &ContentUri) -> MediaDirResult<u64> {
        let mut state = self.state()?;
        state.mutation_attempts += 1;
        if state.index()?.get(uri.address(), uri.id())?.is_none() {
            return Ok(0);
        }
        state.check_access(uri, "delete")?;
        let rows = state.index()?.remove(uri.address(), uri.id())?;
        state.contents.remove(&uri.id());
        state.foreign.remove(&uri.id());
        state.unreadable.remove(&uri.id());
        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(uri = %uri))]
    async fn open_read(&self, uri: &ContentUri) -> MediaDirResult<ReadStream> {
        let mut state = self.state()?;
        if state.index()?.get(uri.address(), uri.id())?.is_none() {
            return Err(StoreError::new(StoreErrorKind::NotFound(uri.to_string())).into());
        }
        if state.unreadable.contains(&uri.id()) {
            return Err(StoreError::new(StoreErrorKind::Io(format!(
                "{} cannot be opened",
                uri
            )))
            .into());
        }
        let bytes = state.contents.get(&uri.id()).cloned().unwrap_or_default();
        Ok(Box::new(MemoryReader {
            inner: Cursor::new(bytes),
            _guard: HandleGuard::new(&self.open),
        }))
    }

    #[tracing::instrument(skip(self), fields(uri = %uri))]
    async fn open_write(&self, uri: &ContentUri) -> MediaDirResult<WriteStream> {
        let mut state = self.state()?;
        if state.index()?.get(uri.address(), uri.id())?.is_none() {
            return Err(StoreError::new(StoreErrorKind::NotFound(uri.to_string())).into());
        }
        state.check_access(uri, "write")?;
        state.contents.insert(uri.id(), Vec::new());
        state
            .index()?
            .record_stats(&[(uri.id(), 0, chrono::Utc::now().timestamp())])?;
        Ok(Box::new(MemoryWriter {
            uri: *uri,
            buffer: Vec::new(),
            dirty: false,
            state: self.state.clone(),
            _guard: HandleGuard::new(&self.open),
        }))
    }
}
