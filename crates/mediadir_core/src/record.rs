//! Record snapshots and column updates.

use crate::ContentUri;
use derive_getters::Getters;
use mediadir_error::{BuilderError, BuilderErrorKind};
use serde::{Deserialize, Serialize};

/// Snapshot of one stored item, as returned by a query.
///
/// The store owns the live record; a `ContentRecord` is a copy taken at query
/// time and goes stale as soon as anyone else mutates the store.
///
/// # Examples
///
/// ```
/// use mediadir_core::{CollectionAddress, ContentRecord, ContentUri};
///
/// let record = ContentRecord::builder()
///     .uri(ContentUri::new(CollectionAddress::Files, 7))
///     .mime_type("application/pdf")
///     .display_name("q1.pdf")
///     .relative_path("Documents/reports")
///     .size(12_345u64)
///     .build()
///     .unwrap();
///
/// assert_eq!(*record.id(), 7);
/// assert_eq!(record.title(), &None);
/// assert!(!record.is_pending());
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, derive_builder::Builder,
)]
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct ContentRecord {
    /// Store identifier
    #[builder(setter(skip))]
    id: u64,
    /// Title, usually the display name without its suffix
    #[builder(default, setter(into, strip_option))]
    title: Option<String>,
    /// Absolute path hint; absent under scoped storage
    #[builder(default, setter(into, strip_option))]
    data_path: Option<String>,
    /// MIME type
    mime_type: String,
    /// Display name
    display_name: String,
    /// Size in bytes
    #[builder(default)]
    size: u64,
    /// Relative path, category root first
    relative_path: String,
    /// Name of the directory directly containing the item
    #[builder(default, setter(into, strip_option))]
    bucket: Option<String>,
    /// Last modification, seconds since the epoch
    #[builder(default)]
    date_modified: i64,
    /// Duration in milliseconds, zero for non-time-based media
    #[builder(default)]
    duration: u64,
    /// Hidden from other readers until cleared
    #[builder(default)]
    #[getter(skip)]
    pending: bool,
    /// Reference handle
    uri: ContentUri,
}

impl ContentRecord {
    /// Creates a new builder.
    pub fn builder() -> ContentRecordBuilder {
        ContentRecordBuilder::default()
    }

    /// Whether the record is still hidden behind its pending flag.
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

impl ContentRecordBuilder {
    /// Build the record.
    ///
    /// The identifier is taken from the reference handle so the two can never
    /// disagree.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing.
    pub fn build(&self) -> Result<ContentRecord, BuilderError> {
        let mut record = self.build_internal().map_err(|e| match e {
            ContentRecordBuilderError::UninitializedField(field) => {
                BuilderError::new(BuilderErrorKind::MissingField(field.to_string()))
            }
            ContentRecordBuilderError::ValidationError(msg) => BuilderError::from(msg),
        })?;
        record.id = record.uri.id();
        Ok(record)
    }
}

/// Column values for an insert or update.
///
/// Only the fields that are set are written; everything else keeps its
/// current value.
///
/// # Examples
///
/// ```
/// use mediadir_core::RecordValues;
///
/// let values = RecordValues::default()
///     .with_display_name("renamed.jpg")
///     .with_pending(true);
///
/// assert_eq!(values.display_name().as_deref(), Some("renamed.jpg"));
/// assert!(!values.is_empty());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_", strip_option, into)]
pub struct RecordValues {
    display_name: Option<String>,
    mime_type: Option<String>,
    relative_path: Option<String>,
    title: Option<String>,
    pending: Option<bool>,
    date_modified: Option<i64>,
}

impl RecordValues {
    /// Whether no column is set.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.mime_type.is_none()
            && self.relative_path.is_none()
            && self.title.is_none()
            && self.pending.is_none()
            && self.date_modified.is_none()
    }
}
