//! Resolved store locations.

use crate::{CollectionAddress, MediaCategory};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Where a category sub-path lives in the store.
///
/// A location pairs the collection handle with the relative path the store
/// records for items under it. The relative path always begins with the
/// category root.
///
/// # Examples
///
/// ```
/// use mediadir_core::{CollectionAddress, ContentLocation, MediaCategory};
///
/// let location = ContentLocation::resolve(MediaCategory::Documents, Some("reports"));
/// assert_eq!(location.relative_path(), "Documents/reports");
/// assert_eq!(*location.address(), CollectionAddress::Files);
///
/// let bare = ContentLocation::resolve(MediaCategory::Documents, None);
/// assert_eq!(bare.relative_path(), "Documents");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct ContentLocation {
    address: CollectionAddress,
    relative_path: String,
}

impl ContentLocation {
    /// Resolve a category and optional sub-path.
    ///
    /// An empty or absent sub-path yields the bare category root. Otherwise the
    /// sub-path is appended after a `/` exactly as given; `..` and repeated
    /// separators are kept because the store interprets them itself.
    pub fn resolve(category: MediaCategory, sub_path: Option<&str>) -> Self {
        let relative_path = match sub_path {
            Some(sub) if !sub.is_empty() => format!("{}/{}", category.root(), sub),
            _ => category.root().to_string(),
        };
        Self {
            address: category.collection_address(),
            relative_path,
        }
    }

    /// The relative path as ordered segments, root first.
    pub fn segments(&self) -> Vec<&str> {
        self.relative_path.split('/').collect()
    }
}
