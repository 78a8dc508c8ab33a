//! Content store error types.

use crate::GrantRequest;

/// Kinds of content store errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StoreErrorKind {
    /// Caller passed an empty or missing required value
    #[display("Invalid argument: {}", _0)]
    InvalidArgument(String),
    /// A record the operation depends on does not exist
    #[display("Record not found: {}", _0)]
    NotFound(String),
    /// The store rejected a new metadata row
    #[display("Insert denied: {}", _0)]
    InsertDenied(String),
    /// The store denied access and offers no way to recover
    #[display("Permission denied: {}", _0)]
    PermissionDenied(String),
    /// The store denied access but can grant it through the user
    #[display("Recoverable permission denied: {} (grant {})", reason, grant)]
    RecoverablePermissionDenied {
        /// Why access was denied
        reason: String,
        /// Grant request to present to the user
        grant: GrantRequest,
    },
    /// Stream read or write failure
    #[display("I/O failure: {}", _0)]
    Io(String),
    /// A row returned by the store is missing an expected column
    #[display("Malformed record: {}", _0)]
    MalformedRecord(String),
    /// An identifier-keyed mutation touched more than one row
    #[display("Integrity violation: {}", _0)]
    IntegrityViolation(String),
    /// Failed to create a directory
    #[display("Failed to create directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to read capture metadata from a record
    #[display("Failed to read photo metadata: {}", _0)]
    Metadata(String),
    /// The provider does not support the requested operation
    #[display("Unsupported operation: {}", _0)]
    Unsupported(String),
}

/// Content store error with location tracking.
///
/// # Examples
///
/// ```
/// use mediadir_error::{StoreError, StoreErrorKind};
///
/// let err = StoreError::new(StoreErrorKind::NotFound("content://media/external/file/3".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// assert!(!err.is_recoverable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Store Error: {} at line {} in {}", kind, line, file)]
pub struct StoreError {
    /// The kind of error that occurred
    pub kind: StoreErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StoreError {
    /// Create a new store error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoreErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StoreErrorKind {
        &self.kind
    }

    /// Whether the store offered a grant request with this denial.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::RecoverablePermissionDenied { .. }
        )
    }

    /// The grant request attached to a recoverable denial.
    pub fn grant_request(&self) -> Option<&GrantRequest> {
        match &self.kind {
            StoreErrorKind::RecoverablePermissionDenied { grant, .. } => Some(grant),
            _ => None,
        }
    }

    /// Whether this error is any kind of permission denial.
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::PermissionDenied(_)
                | StoreErrorKind::RecoverablePermissionDenied { .. }
        )
    }
}
