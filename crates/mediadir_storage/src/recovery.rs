//! Permission recovery for mutations the store denies recoverably.
//!
//! A recoverable denial carries a grant request. The flow parks the mutation
//! under a caller-chosen correlation code, hands the request to a
//! [`PermissionBroker`] for the user to decide, and replays the mutation
//! exactly once when the decision comes back.
//!
//! ```text
//! Idle -> Attempting -> Success
//!                    -> AwaitingGrant -> GrantedRetry -> Success
//!                                                     -> Failed
//!                                     -> Declined
//!                    -> Failed
//! ```

use crate::ContentRecordStore;
use derive_getters::Getters;
use mediadir_core::{ContentUri, MediaCategory, RecordValues};
use mediadir_error::{GrantRequest, MediaDirResult, StoreError, StoreErrorKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Caller-chosen code tying a grant decision back to its parked mutation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    derive_more::Display,
    derive_more::From,
)]
#[display("#{}", _0)]
pub struct CorrelationCode(pub u32);

/// A mutation the flow can attempt and replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Update columns of one record
    Update {
        /// Record to update
        uri: ContentUri,
        /// Columns to write
        values: RecordValues,
    },
    /// Delete one record
    Delete {
        /// Record to delete
        uri: ContentUri,
    },
}

impl Mutation {
    /// Record the mutation targets.
    pub fn uri(&self) -> &ContentUri {
        match self {
            Mutation::Update { uri, .. } | Mutation::Delete { uri } => uri,
        }
    }
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mutation::Update { uri, .. } => write!(f, "update {}", uri),
            Mutation::Delete { uri } => write!(f, "delete {}", uri),
        }
    }
}

/// States a recovery passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum RecoveryState {
    /// Nothing in flight
    #[display("idle")]
    Idle,
    /// First attempt running
    #[display("attempting")]
    Attempting,
    /// Mutation applied
    #[display("success")]
    Success,
    /// Parked until the user decides
    #[display("awaiting grant")]
    AwaitingGrant,
    /// Replaying after approval
    #[display("granted retry")]
    GrantedRetry,
    /// User declined
    #[display("declined")]
    Declined,
    /// Terminal failure
    #[display("failed")]
    Failed,
}

/// The user's answer to a grant request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GrantDecision {
    /// The user approved the request
    #[display("granted")]
    Granted,
    /// The user declined the request
    #[display("declined")]
    Declined,
}

/// What became of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The mutation ran; `rows` is the number of records affected
    Completed {
        /// Rows affected
        rows: u64,
    },
    /// The mutation is parked until [`PermissionRecoveryFlow::resume`] is
    /// called with the same correlation code
    PendingGrant {
        /// Code the decision must be delivered under
        correlation: CorrelationCode,
        /// Request presented to the user
        grant: GrantRequest,
    },
}

/// A mutation parked on a grant request.
#[derive(Debug, Clone, Getters)]
pub struct AwaitingGrant {
    /// The parked mutation
    mutation: Mutation,
    /// The denial that parked it
    denial: StoreError,
}

impl AwaitingGrant {
    /// The grant request that was presented.
    pub fn grant(&self) -> Option<&GrantRequest> {
        self.denial.grant_request()
    }
}

/// Presents grant requests to the user.
///
/// The decision arrives later, through
/// [`PermissionRecoveryFlow::resume`].
#[async_trait::async_trait]
pub trait PermissionBroker: Send + Sync {
    /// Show `grant` to the user, tagged with `correlation`.
    async fn present(&self, correlation: CorrelationCode, grant: &GrantRequest)
    -> MediaDirResult<()>;
}

/// Runs mutations and recovers from recoverable permission denials.
///
/// Parked mutations live in an explicit table keyed by correlation code; at
/// most one mutation may be parked per code.
pub struct PermissionRecoveryFlow {
    store: ContentRecordStore,
    broker: Arc<dyn PermissionBroker>,
    pending: HashMap<CorrelationCode, AwaitingGrant>,
}

impl std::fmt::Debug for PermissionRecoveryFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionRecoveryFlow")
            .field("store", &self.store)
            .field("pending", &self.pending)
            .finish()
    }
}

impl PermissionRecoveryFlow {
    /// Flow over `store`, presenting grant requests through `broker`.
    pub fn new(store: ContentRecordStore, broker: Arc<dyn PermissionBroker>) -> Self {
        Self {
            store,
            broker,
            pending: HashMap::new(),
        }
    }

    /// Mutations currently parked, by correlation code.
    pub fn pending(&self) -> &HashMap<CorrelationCode, AwaitingGrant> {
        &self.pending
    }

    /// Where the recovery for `correlation` stands between calls.
    pub fn state(&self, correlation: CorrelationCode) -> RecoveryState {
        if self.pending.contains_key(&correlation) {
            RecoveryState::AwaitingGrant
        } else {
            RecoveryState::Idle
        }
    }

    /// Drop a parked mutation without replaying it.
    pub fn abandon(&mut self, correlation: CorrelationCode) -> Option<AwaitingGrant> {
        let parked = self.pending.remove(&correlation);
        if parked.is_some() {
            info!(%correlation, "Abandoned parked mutation");
        }
        parked
    }

    async fn attempt(&self, mutation: &Mutation) -> MediaDirResult<u64> {
        match mutation {
            Mutation::Update { uri, values } => self.store.update(uri, values).await,
            Mutation::Delete { uri } => self.store.delete(uri).await,
        }
    }

    /// Attempt a mutation.
    ///
    /// On a recoverable denial the mutation is parked under `correlation`,
    /// the grant request is presented, and `PendingGrant` is returned.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `correlation` already has a parked
    /// mutation. Non-recoverable failures are returned unchanged.
    #[instrument(skip(self), fields(correlation = %correlation, mutation = %mutation))]
    pub async fn execute(
        &mut self,
        correlation: CorrelationCode,
        mutation: Mutation,
    ) -> MediaDirResult<MutationOutcome> {
        if self.pending.contains_key(&correlation) {
            return Err(StoreError::new(StoreErrorKind::InvalidArgument(format!(
                "correlation {} already has a mutation awaiting a grant",
                correlation
            )))
            .into());
        }

        debug!(state = %RecoveryState::Attempting, "Attempting mutation");
        let denial = match self.attempt(&mutation).await {
            Ok(rows) => {
                debug!(state = %RecoveryState::Success, rows, "Mutation applied");
                return Ok(MutationOutcome::Completed { rows });
            }
            Err(e) => {
                let recoverable = e.as_store().filter(|err| err.is_recoverable()).cloned();
                match recoverable {
                    Some(denial) => denial,
                    None => {
                        debug!(state = %RecoveryState::Failed, error = %e, "Mutation failed");
                        return Err(e);
                    }
                }
            }
        };

        let Some(grant) = denial.grant_request().cloned() else {
            return Err(denial.into());
        };
        self.pending.insert(
            correlation,
            AwaitingGrant {
                mutation,
                denial,
            },
        );
        if let Err(e) = self.broker.present(correlation, &grant).await {
            self.pending.remove(&correlation);
            warn!(error = %e, "Could not present grant request");
            return Err(e);
        }

        info!(state = %RecoveryState::AwaitingGrant, grant = %grant, "Mutation parked awaiting grant");
        Ok(MutationOutcome::PendingGrant { correlation, grant })
    }

    /// Deliver the user's decision for a parked mutation.
    ///
    /// On approval the mutation is replayed exactly once. If the record is
    /// gone by then, the outcome is `Completed { rows: 0 }`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if nothing is parked under `correlation`,
    /// and `PermissionDenied` if the user declined or the replay was denied
    /// again.
    #[instrument(skip(self), fields(correlation = %correlation, decision = %decision))]
    pub async fn resume(
        &mut self,
        correlation: CorrelationCode,
        decision: GrantDecision,
    ) -> MediaDirResult<MutationOutcome> {
        let Some(parked) = self.pending.remove(&correlation) else {
            return Err(StoreError::new(StoreErrorKind::InvalidArgument(format!(
                "no mutation awaiting a grant under correlation {}",
                correlation
            )))
            .into());
        };

        if decision == GrantDecision::Declined {
            info!(state = %RecoveryState::Declined, "User declined grant");
            return Err(StoreError::new(StoreErrorKind::PermissionDenied(format!(
                "grant declined for {}: {}",
                parked.mutation, parked.denial.kind
            )))
            .into());
        }

        debug!(state = %RecoveryState::GrantedRetry, "Replaying mutation");
        if !self.store.exists(parked.mutation.uri()).await {
            info!(state = %RecoveryState::Success, "Record gone before replay");
            return Ok(MutationOutcome::Completed { rows: 0 });
        }

        match self.attempt(&parked.mutation).await {
            Ok(rows) => {
                info!(state = %RecoveryState::Success, rows, "Replay applied");
                Ok(MutationOutcome::Completed { rows })
            }
            Err(e) if e.as_store().is_some_and(StoreError::is_permission_denied) => {
                warn!(state = %RecoveryState::Failed, error = %e, "Replay denied again");
                Err(StoreError::new(StoreErrorKind::PermissionDenied(format!(
                    "{} denied again after grant: {}",
                    parked.mutation, e
                )))
                .into())
            }
            Err(e) => {
                warn!(state = %RecoveryState::Failed, error = %e, "Replay failed");
                Err(e)
            }
        }
    }

    /// Delete the newest record with this display name, with recovery.
    ///
    /// Nothing to delete is not a failure: when no record matches, the outcome
    /// is `Completed { rows: 0 }`.
    #[instrument(skip(self))]
    pub async fn delete_by_display_name(
        &mut self,
        correlation: CorrelationCode,
        category: MediaCategory,
        display_name: &str,
        sub_path: Option<&str>,
    ) -> MediaDirResult<MutationOutcome> {
        match self
            .store
            .find_by_display_name(category, display_name, sub_path)
            .await?
        {
            Some(uri) => self.execute(correlation, Mutation::Delete { uri }).await,
            None => {
                debug!(display_name, "Nothing to delete");
                Ok(MutationOutcome::Completed { rows: 0 })
            }
        }
    }

    /// Update the newest record with this display name, with recovery.
    ///
    /// When no record matches, the outcome is `Completed { rows: 0 }`.
    #[instrument(skip(self, values))]
    pub async fn update_by_display_name(
        &mut self,
        correlation: CorrelationCode,
        category: MediaCategory,
        display_name: &str,
        sub_path: Option<&str>,
        values: RecordValues,
    ) -> MediaDirResult<MutationOutcome> {
        match self
            .store
            .find_by_display_name(category, display_name, sub_path)
            .await?
        {
            Some(uri) => {
                self.execute(correlation, Mutation::Update { uri, values })
                    .await
            }
            None => {
                debug!(display_name, "Nothing to update");
                Ok(MutationOutcome::Completed { rows: 0 })
            }
        }
    }
}
