use crate::{config::PROV_OUTCOME, types::ProvisioningOutcome};

/// Block until the current provisioning attempt reaches a terminal state
/// and report which.
///
/// The raised outcome is cleared on observation: a second call with no new
/// attempt blocks instead of returning stale state. The connection task
/// raises exactly one outcome per attempt, so `connected` and `failed` can
/// never be pending at the same time.
pub async fn wait_outcome() -> ProvisioningOutcome {
    PROV_OUTCOME.wait().await
}
