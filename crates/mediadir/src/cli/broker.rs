//! Grant requests surfaced on the terminal.

use mediadir_error::{GrantRequest, MediaDirResult};
use mediadir_storage::{CorrelationCode, PermissionBroker};
use tracing::warn;

/// Reports grant requests on stderr.
///
/// A one-shot command cannot wait for the decision, so the request is shown
/// and the mutation stays parked until the process exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleBroker;

#[async_trait::async_trait]
impl PermissionBroker for ConsoleBroker {
    async fn present(&self, correlation: CorrelationCode, grant: &GrantRequest) -> MediaDirResult<()> {
        warn!(%correlation, token = grant.token(), "Approval required");
        eprintln!("Approval required ({}): {}", correlation, grant.action());
        eprintln!("Grant token: {}", grant.token());
        Ok(())
    }
}
