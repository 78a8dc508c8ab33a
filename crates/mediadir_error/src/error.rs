//! Top-level error wrapper types.

use crate::{BuilderError, ConfigError, StoreError, StoreErrorKind};

/// Every error a mediadir operation can produce.
///
/// # Examples
///
/// ```
/// use mediadir_error::{MediaDirError, StoreError, StoreErrorKind};
///
/// let store_err = StoreError::new(StoreErrorKind::Io("broken pipe".to_string()));
/// let err: MediaDirError = store_err.into();
/// assert!(format!("{}", err).contains("I/O failure"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum MediaDirErrorKind {
    /// Content store error
    #[from(StoreError)]
    Store(StoreError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
}

/// mediadir error with kind discrimination.
///
/// # Examples
///
/// ```
/// use mediadir_error::{ConfigError, MediaDirResult};
///
/// fn might_fail() -> MediaDirResult<()> {
///     Err(ConfigError::new("Missing root"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("MediaDir Error: {}", _0)]
pub struct MediaDirError(Box<MediaDirErrorKind>);

impl MediaDirError {
    /// Create a new error from a kind.
    pub fn new(kind: MediaDirErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MediaDirErrorKind {
        &self.0
    }

    /// The store error kind, if this is a store error.
    pub fn store_kind(&self) -> Option<&StoreErrorKind> {
        match self.kind() {
            MediaDirErrorKind::Store(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// The underlying store error, if this is a store error.
    pub fn as_store(&self) -> Option<&StoreError> {
        match self.kind() {
            MediaDirErrorKind::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<T> for MediaDirError
where
    T: Into<MediaDirErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for mediadir operations.
pub type MediaDirResult<T> = std::result::Result<T, MediaDirError>;
