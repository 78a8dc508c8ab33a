//! mediadir - category-based access to a shared content store
//!
//! Callers name a media category and an optional sub-path instead of a raw
//! filesystem path. mediadir resolves that into the store's addressing scheme,
//! runs queries and mutations against it, streams bytes in and out, and
//! recovers from transient permission denials through a user-mediated grant
//! flow.
//!
//! # Quick Start
//!
//! ```rust
//! use mediadir::{ContentRecordStore, InMemoryProvider, MediaCategory, StreamTransfer};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ContentRecordStore::new(Arc::new(InMemoryProvider::default()));
//! let transfer = StreamTransfer::new(store.clone());
//!
//! let uri = transfer
//!     .save_stream_to_category(MediaCategory::Documents, &b"%PDF"[..], "q1.pdf", Some("reports"))
//!     .await?;
//!
//! let record = store.get(&uri).await?.expect("just saved");
//! assert_eq!(record.relative_path(), "Documents/reports");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `mediadir_error` - Error types
//! - `mediadir_core` - Categories, locations, handles, records, configuration
//! - `mediadir_storage` - Store boundary, queries, transfer, visibility and
//!   permission recovery
//!
//! This crate re-exports everything for convenience and carries the `mediadir`
//! command-line tool.

pub use mediadir_core::*;
pub use mediadir_error::*;
pub use mediadir_storage::*;

pub mod cli;
pub mod telemetry;
