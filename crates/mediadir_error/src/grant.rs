//! Grant requests issued by the store on recoverable denials.

/// One-shot, user-mediated authorization token produced by the store.
///
/// The token is opaque to mediadir: it is handed to a permission broker,
/// presented to the user, and consumed by the store when the user approves.
///
/// # Examples
///
/// ```
/// use mediadir_error::GrantRequest;
///
/// let grant = GrantRequest::new("grant-7", "delete content://media/external/images/media/7");
/// assert_eq!(grant.token(), "grant-7");
/// assert!(format!("{}", grant).contains("grant-7"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{} ({})", token, action)]
pub struct GrantRequest {
    token: String,
    action: String,
}

impl GrantRequest {
    /// Create a grant request for the given token and the action it would authorize.
    pub fn new(token: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            action: action.into(),
        }
    }

    /// The opaque token the store will accept once the user approves.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Human-readable description of the action awaiting approval.
    pub fn action(&self) -> &str {
        &self.action
    }
}
