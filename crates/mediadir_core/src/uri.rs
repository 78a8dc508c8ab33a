//! Reference handles for stored records.

use crate::CollectionAddress;
use mediadir_error::{StoreError, StoreErrorKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Store-issued locator for one record.
///
/// A handle denotes the record last known at its identifier. Records can be
/// deleted by other processes at any time, so callers re-check existence
/// before mutations that depend on current state.
///
/// # Examples
///
/// ```
/// use mediadir_core::{CollectionAddress, ContentUri};
///
/// let uri = ContentUri::new(CollectionAddress::Images, 42);
/// assert_eq!(uri.to_string(), "content://media/external/images/media/42");
///
/// let parsed: ContentUri = "content://media/external/images/media/42".parse().unwrap();
/// assert_eq!(parsed, uri);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display,
)]
#[display("{}/{}", address, id)]
#[serde(try_from = "String", into = "String")]
pub struct ContentUri {
    address: CollectionAddress,
    id: u64,
}

impl ContentUri {
    /// Create a handle for an identifier inside a collection.
    pub fn new(address: CollectionAddress, id: u64) -> Self {
        Self { address, id }
    }

    /// Collection the record belongs to.
    pub fn address(&self) -> CollectionAddress {
        self.address
    }

    /// Stable store identifier.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl FromStr for ContentUri {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for address in CollectionAddress::iter() {
            let prefix = address.to_string();
            let id = s
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'));
            if let Some(id) = id {
                let id = id.parse::<u64>().map_err(|e| {
                    StoreError::new(StoreErrorKind::InvalidArgument(format!(
                        "bad record id in {}: {}",
                        s, e
                    )))
                })?;
                return Ok(Self { address, id });
            }
        }
        Err(StoreError::new(StoreErrorKind::InvalidArgument(format!(
            "not a content uri: {}",
            s
        ))))
    }
}

impl TryFrom<String> for ContentUri {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentUri> for String {
    fn from(uri: ContentUri) -> Self {
        uri.to_string()
    }
}
