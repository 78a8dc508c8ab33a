//! The content provider seam.
//!
//! A provider is the external store: it owns record metadata, assigns
//! identifiers, enforces permissions and hands out byte streams. Everything
//! above this trait is provider-agnostic.

use crate::Selection;
use mediadir_core::{CollectionAddress, Column, ContentUri, RecordValues, SortOrder, StorageMode};
use mediadir_error::{MediaDirResult, StoreError, StoreErrorKind};
use std::collections::BTreeMap;
use tokio::io::{AsyncRead, AsyncWrite};

/// Readable byte stream for one record.
pub type ReadStream = Box<dyn AsyncRead + Send + Unpin>;

/// Writable byte stream for one record. Writing truncates existing content.
pub type WriteStream = Box<dyn AsyncWrite + Send + Unpin>;

/// A single column value as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum Value {
    /// No value
    #[display("NULL")]
    Null,
    /// Integer value
    #[display("{}", _0)]
    Integer(i64),
    /// Text value
    #[display("{}", _0)]
    Text(String),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One row of a query result, keyed by column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: BTreeMap<Column, Value>,
}

impl Row {
    /// Empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, builder style.
    pub fn with(mut self, column: Column, value: impl Into<Value>) -> Self {
        self.values.insert(column, value.into());
        self
    }

    /// Set a column.
    pub fn insert(&mut self, column: Column, value: impl Into<Value>) {
        self.values.insert(column, value.into());
    }

    /// Raw value of a column, if the column is present.
    pub fn get(&self, column: Column) -> Option<&Value> {
        self.values.get(&column)
    }

    fn present(&self, column: Column) -> MediaDirResult<&Value> {
        self.values.get(&column).ok_or_else(|| {
            StoreError::new(StoreErrorKind::MalformedRecord(format!(
                "column {} missing from row",
                column
            )))
            .into()
        })
    }

    /// Integer value of a column that must be present and non-null.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` if the column is absent, null or not an integer.
    pub fn integer(&self, column: Column) -> MediaDirResult<i64> {
        match self.present(column)? {
            Value::Integer(value) => Ok(*value),
            Value::Text(text) => text.parse().map_err(|_| {
                StoreError::new(StoreErrorKind::MalformedRecord(format!(
                    "column {} holds non-integer {:?}",
                    column, text
                )))
                .into()
            }),
            Value::Null => Err(StoreError::new(StoreErrorKind::MalformedRecord(format!(
                "column {} is null",
                column
            )))
            .into()),
        }
    }

    /// Text value of a column that must be present; null reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` if the column is absent.
    pub fn text(&self, column: Column) -> MediaDirResult<Option<String>> {
        Ok(match self.present(column)? {
            Value::Null => None,
            Value::Integer(value) => Some(value.to_string()),
            Value::Text(text) => Some(text.clone()),
        })
    }

    /// Text value of a column that must be present and non-null.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` if the column is absent or null.
    pub fn required_text(&self, column: Column) -> MediaDirResult<String> {
        self.text(column)?.ok_or_else(|| {
            StoreError::new(StoreErrorKind::MalformedRecord(format!(
                "column {} is null",
                column
            )))
            .into()
        })
    }
}

/// Forward-only cursor over query results.
///
/// Dropping the cursor releases whatever the provider holds for it.
#[async_trait::async_trait]
pub trait RowCursor: Send {
    /// Next row, or `None` once the results are exhausted.
    async fn next_row(&mut self) -> MediaDirResult<Option<Row>>;
}

/// Cursor over rows the provider has already materialized.
#[derive(Debug)]
pub struct VecCursor {
    rows: std::vec::IntoIter<Row>,
}

impl VecCursor {
    /// Cursor yielding `rows` in order.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

#[async_trait::async_trait]
impl RowCursor for VecCursor {
    async fn next_row(&mut self) -> MediaDirResult<Option<Row>> {
        Ok(self.rows.next())
    }
}

/// Trait for pluggable content stores.
///
/// Implementations handle record metadata, identifier assignment, permission
/// checks and the byte content behind each record.
///
/// Identifier-keyed mutations affect at most one row; callers treat a larger
/// count as a broken store.
#[async_trait::async_trait]
pub trait ContentProvider: Send + Sync {
    /// Whether absolute path hints are reported.
    fn storage_mode(&self) -> StorageMode;

    /// Insert a metadata row and return its reference handle.
    ///
    /// `values` must carry a display name and relative path; the store decides
    /// whether the row is acceptable for `address`.
    ///
    /// # Errors
    ///
    /// Returns `InsertDenied` if the store rejects the row.
    async fn insert(
        &self,
        address: CollectionAddress,
        values: &RecordValues,
    ) -> MediaDirResult<ContentUri>;

    /// Run a query. Only the projected columns are guaranteed to be present
    /// in the returned rows.
    async fn query(
        &self,
        address: CollectionAddress,
        projection: &[Column],
        selection: &Selection,
        sort: &SortOrder,
    ) -> MediaDirResult<Box<dyn RowCursor>>;

    /// Apply column updates to one record, returning rows affected.
    ///
    /// # Errors
    ///
    /// Returns a permission denial, possibly recoverable, if this process may
    /// not modify the record.
    async fn update(&self, uri: &ContentUri, values: &RecordValues) -> MediaDirResult<u64>;

    /// Delete one record and its bytes, returning rows affected.
    ///
    /// # Errors
    ///
    /// Returns a permission denial, possibly recoverable, if this process may
    /// not delete the record.
    async fn delete(&self, uri: &ContentUri) -> MediaDirResult<u64>;

    /// Open the record's bytes for reading.
    async fn open_read(&self, uri: &ContentUri) -> MediaDirResult<ReadStream>;

    /// Open the record's bytes for writing, truncating existing content.
    async fn open_write(&self, uri: &ContentUri) -> MediaDirResult<WriteStream>;
}
