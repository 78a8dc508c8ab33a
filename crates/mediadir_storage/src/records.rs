//! Category-scoped record operations.

use crate::{ContentProvider, Lookup, QueryBuilder, Row};
use futures::stream::{BoxStream, TryStreamExt};
use mediadir_core::{
    CollectionAddress, Column, ContentRecord, ContentUri, MediaCategory, RecordValues, SortOrder,
    StorageMode,
};
use mediadir_error::{MediaDirResult, StoreError, StoreErrorKind};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Decode a full-projection row into a record snapshot.
///
/// # Errors
///
/// Returns `MalformedRecord` if a required column is missing or null, or if
/// the identifier, size or duration is negative.
pub fn decode_record(address: CollectionAddress, row: &Row) -> MediaDirResult<ContentRecord> {
    let id = non_negative(Column::Id, row.integer(Column::Id)?)?;
    let mut builder = ContentRecord::builder();
    builder
        .uri(ContentUri::new(address, id))
        .mime_type(row.required_text(Column::MimeType)?)
        .display_name(row.required_text(Column::DisplayName)?)
        .size(non_negative(Column::Size, row.integer(Column::Size)?)?)
        .relative_path(row.required_text(Column::RelativePath)?)
        .date_modified(row.integer(Column::DateModified)?)
        .duration(non_negative(Column::Duration, row.integer(Column::Duration)?)?)
        .pending(row.integer(Column::IsPending)? != 0);
    if let Some(title) = row.text(Column::Title)? {
        builder.title(title);
    }
    if let Some(data_path) = row.text(Column::DataPath)? {
        builder.data_path(data_path);
    }
    if let Some(bucket) = row.text(Column::Bucket)? {
        builder.bucket(bucket);
    }
    Ok(builder.build()?)
}

fn require_display_name(display_name: &str) -> MediaDirResult<()> {
    if display_name.is_empty() {
        return Err(StoreError::new(StoreErrorKind::InvalidArgument(
            "display name is empty".to_string(),
        ))
        .into());
    }
    Ok(())
}

fn non_negative(column: Column, value: i64) -> MediaDirResult<u64> {
    u64::try_from(value).map_err(|_| {
        StoreError::new(StoreErrorKind::MalformedRecord(format!(
            "column {} holds negative {}",
            column, value
        )))
        .into()
    })
}

/// Guard identifier-keyed mutations against touching more than one row.
fn single_row(operation: &str, uri: &ContentUri, rows: u64) -> MediaDirResult<u64> {
    if rows > 1 {
        error!(%uri, rows, operation, "Identifier-keyed mutation touched several rows");
        return Err(StoreError::new(StoreErrorKind::IntegrityViolation(format!(
            "{} of {} affected {} rows",
            operation, uri, rows
        )))
        .into());
    }
    Ok(rows)
}

/// A lazy, restartable query over one category.
///
/// Nothing is read until [`stream`](Self::stream) is polled, and every call to
/// `stream` re-runs the query from the start. Dropping a stream early releases
/// the provider cursor behind it.
#[derive(Clone)]
pub struct RecordQuery {
    provider: Arc<dyn ContentProvider>,
    address: CollectionAddress,
    builder: QueryBuilder,
}

impl std::fmt::Debug for RecordQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordQuery")
            .field("address", &self.address)
            .field("builder", &self.builder)
            .finish()
    }
}

impl RecordQuery {
    /// Skip records that are still pending.
    pub fn visible_only(mut self) -> Self {
        self.builder = self.builder.visible_only();
        self
    }

    /// The lookup this query runs.
    pub fn lookup(&self) -> Lookup {
        self.builder.clone().build()
    }

    /// Collection the query runs against.
    pub fn address(&self) -> CollectionAddress {
        self.address
    }

    /// Stream record snapshots in sort order.
    pub fn stream(&self) -> BoxStream<'static, MediaDirResult<ContentRecord>> {
        let provider = self.provider.clone();
        let address = self.address;
        let lookup = self.lookup();
        Box::pin(async_stream::try_stream! {
            let mut cursor = provider
                .query(address, &Column::RECORD, &lookup.selection, &lookup.sort)
                .await?;
            while let Some(row) = cursor.next_row().await? {
                yield decode_record(address, &row)?;
            }
        })
    }

    /// Run the query to completion.
    pub async fn collect(&self) -> MediaDirResult<Vec<ContentRecord>> {
        self.stream().try_collect().await
    }
}

/// Record-level operations over a content provider, addressed by category.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use mediadir_core::MediaCategory;
/// use mediadir_storage::{ContentRecordStore, InMemoryProvider};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = ContentRecordStore::new(Arc::new(InMemoryProvider::default()));
/// let uri = store
///     .insert_placeholder(MediaCategory::Documents, "q1.pdf", Some("reports"))
///     .await?;
///
/// let found = store
///     .find_by_display_name(MediaCategory::Documents, "q1.pdf", Some("reports"))
///     .await?;
/// assert_eq!(found, Some(uri));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ContentRecordStore {
    provider: Arc<dyn ContentProvider>,
    default_sort: SortOrder,
}

impl std::fmt::Debug for ContentRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRecordStore")
            .field("storage_mode", &self.provider.storage_mode())
            .field("default_sort", &self.default_sort)
            .finish()
    }
}

impl ContentRecordStore {
    /// Store over `provider`, listing newest first by default.
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        Self {
            provider,
            default_sort: SortOrder::default(),
        }
    }

    /// Sort order for queries that don't name one.
    pub fn with_default_sort(mut self, sort: SortOrder) -> Self {
        self.default_sort = sort;
        self
    }

    /// The underlying provider.
    pub fn provider(&self) -> &Arc<dyn ContentProvider> {
        &self.provider
    }

    /// Whether absolute path hints are available.
    pub fn storage_mode(&self) -> StorageMode {
        self.provider.storage_mode()
    }

    /// Lazy query over every record under a category sub-path.
    ///
    /// With no sub-path this covers the whole category root.
    pub fn query_all(
        &self,
        category: MediaCategory,
        sub_path: Option<&str>,
        sort: Option<SortOrder>,
    ) -> RecordQuery {
        let location = category.locate(sub_path);
        RecordQuery {
            provider: self.provider.clone(),
            address: *location.address(),
            builder: QueryBuilder::new()
                .within(&location)
                .sort(sort.unwrap_or(self.default_sort)),
        }
    }

    /// Snapshot of one record, if it still exists.
    #[instrument(skip(self), fields(uri = %uri))]
    pub async fn get(&self, uri: &ContentUri) -> MediaDirResult<Option<ContentRecord>> {
        let lookup = QueryBuilder::new().id(uri.id()).build();
        let mut cursor = self
            .provider
            .query(uri.address(), &Column::RECORD, &lookup.selection, &lookup.sort)
            .await?;
        match cursor.next_row().await? {
            Some(row) => Ok(Some(decode_record(uri.address(), &row)?)),
            None => Ok(None),
        }
    }

    /// Newest record with this display name under the category sub-path.
    ///
    /// When several records share the name, the highest identifier wins.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty display name.
    #[instrument(skip(self))]
    pub async fn find_by_display_name(
        &self,
        category: MediaCategory,
        display_name: &str,
        sub_path: Option<&str>,
    ) -> MediaDirResult<Option<ContentUri>> {
        require_display_name(display_name)?;
        let location = category.locate(sub_path);
        let lookup = QueryBuilder::new()
            .display_name(display_name)
            .within(&location)
            .sort(SortOrder::newest_first())
            .build();
        let mut cursor = self
            .provider
            .query(
                *location.address(),
                &[Column::Id],
                &lookup.selection,
                &lookup.sort,
            )
            .await?;
        let found = match cursor.next_row().await? {
            Some(row) => {
                let id = non_negative(Column::Id, row.integer(Column::Id)?)?;
                Some(ContentUri::new(*location.address(), id))
            }
            None => None,
        };
        debug!(found = ?found, "Display name lookup");
        Ok(found)
    }

    /// Absolute path hint of the newest record with this display name.
    ///
    /// `None` when no record matches, or when the store withholds paths.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty display name.
    #[instrument(skip(self))]
    pub async fn resolve_real_path(
        &self,
        category: MediaCategory,
        display_name: &str,
        sub_path: Option<&str>,
    ) -> MediaDirResult<Option<String>> {
        require_display_name(display_name)?;
        let location = category.locate(sub_path);
        let lookup = QueryBuilder::new()
            .display_name(display_name)
            .within(&location)
            .sort(SortOrder::newest_first())
            .build();
        let mut cursor = self
            .provider
            .query(
                *location.address(),
                &[Column::Id, Column::DataPath],
                &lookup.selection,
                &lookup.sort,
            )
            .await?;
        match cursor.next_row().await? {
            Some(row) => row.text(Column::DataPath),
            None => Ok(None),
        }
    }

    /// Whether the record's bytes can currently be opened.
    ///
    /// Any failure to open counts as absent.
    #[instrument(skip(self), fields(uri = %uri))]
    pub async fn exists(&self, uri: &ContentUri) -> bool {
        match self.provider.open_read(uri).await {
            Ok(stream) => {
                drop(stream);
                true
            }
            Err(e) => {
                debug!(error = %e, "Record not openable");
                false
            }
        }
    }

    async fn insert_record(
        &self,
        category: MediaCategory,
        display_name: &str,
        sub_path: Option<&str>,
        pending: bool,
    ) -> MediaDirResult<ContentUri> {
        require_display_name(display_name)?;
        let location = category.locate(sub_path);
        let values = RecordValues::default()
            .with_display_name(display_name)
            .with_mime_type(category.mime_type_for(display_name))
            .with_relative_path(location.relative_path().clone())
            .with_pending(pending);
        let uri = self.provider.insert(*location.address(), &values).await?;
        info!(%uri, relative_path = %location.relative_path(), pending, "Inserted record");
        Ok(uri)
    }

    /// Insert a visible record with no bytes yet.
    ///
    /// The MIME type is inferred from the display name and the title is the
    /// display name without its suffix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty display name and `InsertDenied`
    /// if the store rejects the row.
    #[instrument(skip(self))]
    pub async fn insert_placeholder(
        &self,
        category: MediaCategory,
        display_name: &str,
        sub_path: Option<&str>,
    ) -> MediaDirResult<ContentUri> {
        self.insert_record(category, display_name, sub_path, false)
            .await
    }

    /// Insert a record hidden behind its pending flag.
    ///
    /// Other readers skip it until [`VisibilityGate`](crate::VisibilityGate)
    /// reveals it.
    #[instrument(skip(self))]
    pub async fn insert_pending(
        &self,
        category: MediaCategory,
        display_name: &str,
        sub_path: Option<&str>,
    ) -> MediaDirResult<ContentUri> {
        self.insert_record(category, display_name, sub_path, true)
            .await
    }

    /// Apply column updates to one record.
    ///
    /// # Errors
    ///
    /// Propagates permission denials unchanged; returns `IntegrityViolation`
    /// if the store reports more than one affected row.
    #[instrument(skip(self, values), fields(uri = %uri))]
    pub async fn update(&self, uri: &ContentUri, values: &RecordValues) -> MediaDirResult<u64> {
        let rows = self.provider.update(uri, values).await?;
        single_row("update", uri, rows)
    }

    /// Delete one record and its bytes.
    ///
    /// # Errors
    ///
    /// Propagates permission denials unchanged; returns `IntegrityViolation`
    /// if the store reports more than one affected row.
    #[instrument(skip(self), fields(uri = %uri))]
    pub async fn delete(&self, uri: &ContentUri) -> MediaDirResult<u64> {
        let rows = self.provider.delete(uri).await?;
        single_row("delete", uri, rows)
    }

    /// Reference handle for an identifier in the category's collection.
    pub fn uri_for_id(&self, category: MediaCategory, id: u64) -> ContentUri {
        ContentUri::new(category.collection_address(), id)
    }
}
