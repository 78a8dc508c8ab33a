//! Category-scoped content store for mediadir.
//!
//! This crate resolves logical media categories to store locations and runs
//! record operations against a pluggable [`ContentProvider`]: lookups,
//! placeholder inserts, stream copies, pending-flag control and permission
//! recovery for mutations the store denies recoverably.
//!
//! # Features
//!
//! - **Parameterized queries**: caller text only ever travels as bound arguments
//! - **Lazy, restartable listing**: queries run when streamed and release their
//!   cursor when dropped
//! - **Pluggable providers**: in-memory and filesystem providers are bundled
//! - **Explicit recovery**: parked mutations live in a caller-visible table
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use futures::TryStreamExt;
//! use mediadir_core::MediaCategory;
//! use mediadir_storage::{ContentRecordStore, InMemoryProvider, StreamTransfer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ContentRecordStore::new(Arc::new(InMemoryProvider::default()));
//! let transfer = StreamTransfer::new(store.clone());
//!
//! transfer
//!     .save_stream_to_category(MediaCategory::Documents, &b"%PDF-1.7"[..], "q1.pdf", Some("reports"))
//!     .await?;
//!
//! let records: Vec<_> = store
//!     .query_all(MediaCategory::Documents, Some("reports"), None)
//!     .stream()
//!     .try_collect()
//!     .await?;
//! assert_eq!(records.len(), 1);
//! assert_eq!(*records[0].size(), 8);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod index;
mod memory;
mod photo;
mod provider;
mod query;
mod records;
mod recovery;
mod transfer;
mod visibility;

pub use filesystem::FileSystemProvider;
pub use memory::{ForeignAccess, InMemoryProvider};
pub use photo::{PhotoMetadataReader, parse_photo_exif};
pub use provider::{ContentProvider, ReadStream, Row, RowCursor, Value, VecCursor, WriteStream};
pub use query::{
    LIKE_ESCAPE, Lookup, Operator, Predicate, QueryBuilder, Selection, escape_like,
};
pub use records::{ContentRecordStore, RecordQuery, decode_record};
pub use recovery::{
    AwaitingGrant, CorrelationCode, GrantDecision, Mutation, MutationOutcome, PermissionBroker,
    PermissionRecoveryFlow, RecoveryState,
};
pub use transfer::{DEFAULT_BUFFER_SIZE, StreamTransfer};
pub use visibility::VisibilityGate;

pub use mediadir_error::{GrantRequest, StoreError, StoreErrorKind};
