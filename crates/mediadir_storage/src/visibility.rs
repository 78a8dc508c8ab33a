//! Pending-flag control.

use crate::ContentRecordStore;
use mediadir_core::{ContentUri, RecordValues};
use mediadir_error::MediaDirResult;
use tracing::{debug, instrument};

/// Hides and reveals records through their pending flag.
///
/// While a record is pending, other readers skip it. Setting the flag is
/// idempotent.
#[derive(Debug, Clone)]
pub struct VisibilityGate {
    store: ContentRecordStore,
}

impl VisibilityGate {
    /// Gate over `store`.
    pub fn new(store: ContentRecordStore) -> Self {
        Self { store }
    }

    /// Set or clear the pending flag.
    ///
    /// Returns `true` iff exactly one record was updated.
    ///
    /// # Errors
    ///
    /// Permission denials are returned unchanged.
    #[instrument(skip(self), fields(uri = %uri))]
    pub async fn set_hidden(&self, uri: &ContentUri, hidden: bool) -> MediaDirResult<bool> {
        let rows = self
            .store
            .update(uri, &RecordValues::default().with_pending(hidden))
            .await?;
        debug!(rows, "Updated pending flag");
        Ok(rows == 1)
    }

    /// Hide a record from other readers.
    pub async fn hide(&self, uri: &ContentUri) -> MediaDirResult<bool> {
        self.set_hidden(uri, true).await
    }

    /// Make a record visible to other readers.
    pub async fn reveal(&self, uri: &ContentUri) -> MediaDirResult<bool> {
        self.set_hidden(uri, false).await
    }
}
