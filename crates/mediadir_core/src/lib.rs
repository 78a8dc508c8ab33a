//! Core data types for the mediadir content store library.
//!
//! This crate provides the vocabulary shared by every mediadir crate: the
//! fixed category table, content locations and reference handles, record
//! snapshots, and configuration.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod category;
mod column;
mod config;
mod exif;
mod location;
mod mime;
mod mode;
mod record;
mod uri;

pub use category::{CollectionAddress, MediaCategory};
pub use column::{Column, SortDirection, SortOrder};
pub use config::MediaDirConfig;
pub use exif::PhotoExifInfo;
pub use location::ContentLocation;
pub use mime::{OCTET_STREAM, mime_type_for_suffix};
pub use mode::StorageMode;
pub use record::{ContentRecord, ContentRecordBuilder, RecordValues};
pub use uri::ContentUri;
