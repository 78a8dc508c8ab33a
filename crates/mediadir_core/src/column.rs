//! Store record schema and sort orders.

use serde::{Deserialize, Serialize};

/// Columns of the store's record schema that mediadir reads or writes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Store-assigned identifier
    #[display("id")]
    Id,
    /// Title (display name without extension)
    #[display("title")]
    Title,
    /// Absolute path hint
    #[display("data_path")]
    DataPath,
    /// MIME type
    #[display("mime_type")]
    MimeType,
    /// Display name
    #[display("display_name")]
    DisplayName,
    /// Size in bytes
    #[display("size")]
    Size,
    /// Path relative to the volume root, category root first
    #[display("relative_path")]
    RelativePath,
    /// Name of the directory directly containing the item
    #[display("bucket")]
    Bucket,
    /// Last modification, seconds since the epoch
    #[display("date_modified")]
    DateModified,
    /// Playback duration in milliseconds
    #[display("duration")]
    Duration,
    /// Pending flag: 1 hides the record from other readers
    #[display("is_pending")]
    IsPending,
}

impl Column {
    /// Every column a full record snapshot is decoded from.
    pub const RECORD: [Column; 11] = [
        Column::Id,
        Column::Title,
        Column::DataPath,
        Column::MimeType,
        Column::DisplayName,
        Column::Size,
        Column::RelativePath,
        Column::Bucket,
        Column::DateModified,
        Column::Duration,
        Column::IsPending,
    ];
}

/// Direction of a sort.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    #[display("ASC")]
    Ascending,
    /// Largest first
    #[default]
    #[display("DESC")]
    Descending,
}

/// Sort clause passed to the store.
///
/// Defaults to newest first (descending identifier).
///
/// # Examples
///
/// ```
/// use mediadir_core::{Column, SortDirection, SortOrder};
///
/// assert_eq!(SortOrder::default().to_string(), "id DESC");
/// assert_eq!(
///     SortOrder::new(Column::DisplayName, SortDirection::Ascending).to_string(),
///     "display_name ASC"
/// );
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[display("{} {}", column, direction)]
pub struct SortOrder {
    /// Column to sort by
    pub column: Column,
    /// Sort direction
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortOrder {
    /// Create a sort order.
    pub fn new(column: Column, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Newest first.
    pub fn newest_first() -> Self {
        Self::new(Column::Id, SortDirection::Descending)
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::newest_first()
    }
}
