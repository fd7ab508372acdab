//! Completion waiting for asynchronous deletes
//!
//! Polls a probe at a fixed interval until the resource is gone, the attempt
//! budget runs out, or the run is cancelled.

use crate::controller::{ProbeStatus, WaitPolicy};
use crate::error::{Result, SweepError};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Block until `probe` reports the resource gone
///
/// # Returns
/// * `Ok(())` - the probe reported `Gone`
/// * `Err(DeletionTimeout)` - still present after `policy.max_attempts` probes
///   (at least one probe is always made)
/// * `Err(Cancelled)` - the token fired before the resource disappeared
/// * any error returned by `probe`, unchanged and without retrying
pub async fn wait_until_gone<F, Fut>(
    resource_type: &str,
    identifier: &str,
    policy: WaitPolicy,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ProbeStatus>>,
{
    let cancelled = || SweepError::Cancelled {
        resource_type: resource_type.to_string(),
        identifier: identifier.to_string(),
    };

    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        match probe().await {
            Ok(ProbeStatus::Gone) => {
                debug!(resource_type, identifier, attempt, "Deletion confirmed");
                return Ok(());
            }
            Ok(ProbeStatus::StillPresent) => {
                debug!(resource_type, identifier, attempt, "Still present, waiting");
            }
            Err(e) => {
                warn!(resource_type, identifier, error = %e, "Deletion check failed");
                return Err(e);
            }
        }

        // No sleep after the final probe
        if attempt < max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(policy.interval) => {}
                _ = cancel.cancelled() => return Err(cancelled()),
            }
        }
    }

    Err(SweepError::DeletionTimeout {
        resource_type: resource_type.to_string(),
        identifier: identifier.to_string(),
        attempts: max_attempts,
    })
}
