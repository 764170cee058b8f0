//! Target availability checks.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;
use tokio::task::JoinSet;

use super::ProbeError;
use crate::catalog::Target;

/// Reachability per target id.
pub type TargetStatus = BTreeMap<String, bool>;

/// Checks each target's health endpoint with a short timeout.
#[derive(Debug, Clone)]
pub struct AvailabilityChecker {
    client: Client,
    timeout: Duration,
}

impl AvailabilityChecker {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Check all given targets concurrently.
    ///
    /// Every target appears in the returned map; any failure reads as
    /// unavailable.
    pub async fn check_targets(&self, targets: &[Target]) -> TargetStatus {
        let mut status: TargetStatus = targets.iter().map(|t| (t.id.clone(), false)).collect();

        let mut checks = JoinSet::new();
        for target in targets {
            let client = self.client.clone();
            let timeout = self.timeout;
            let target = target.clone();
            checks.spawn(async move {
                let result = check_target(&client, &target, timeout).await;
                (target.id, result)
            });
        }

        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok((id, Ok(()))) => {
                    status.insert(id, true);
                }
                Ok((id, Err(e))) => {
                    tracing::debug!("Target {} unavailable: {}", id, e);
                }
                Err(e) => {
                    tracing::error!("Availability check task failed: {}", e);
                }
            }
        }

        status
    }
}

async fn check_target(client: &Client, target: &Target, timeout: Duration) -> Result<(), ProbeError> {
    let request = client
        .get(&target.health_url)
        .header(ACCEPT, "application/json")
        .send();

    let response = tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| ProbeError::Timeout(timeout))?
        .map_err(ProbeError::from_transport)?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(ProbeError::from_status(response.status()))
    }
}
