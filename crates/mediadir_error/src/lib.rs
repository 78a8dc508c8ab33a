//! Error types for the mediadir library.
//!
//! This crate provides the foundation error types used throughout the mediadir crates.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use mediadir_error::{MediaDirResult, StoreError, StoreErrorKind};
//!
//! fn open_record() -> MediaDirResult<Vec<u8>> {
//!     Err(StoreError::new(StoreErrorKind::Io("stream closed".to_string())))?
//! }
//!
//! match open_record() {
//!     Ok(bytes) => println!("Read {} bytes", bytes.len()),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;
mod grant;
mod storage;

pub use builder::{BuilderError, BuilderErrorKind};
pub use config::ConfigError;
pub use error::{MediaDirError, MediaDirErrorKind, MediaDirResult};
pub use grant::GrantRequest;
pub use storage::{StoreError, StoreErrorKind};
