//! HTTP probe executor.

use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, RequestBuilder, StatusCode};

use super::{ProbeError, ProbeResult};
use crate::catalog::ProbeDescriptor;

/// Issues one HTTP call per probe and classifies the outcome.
#[derive(Debug, Clone)]
pub struct Executor {
    client: Client,
    timeout: Duration,
}

impl Executor {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Issue a probe.
    ///
    /// The returned handle carries the pending result; the request itself
    /// runs, and its elapsed time starts, when the handle is settled.
    pub fn issue(&self, id: u64, descriptor: &ProbeDescriptor) -> InFlight {
        let mut request = self
            .client
            .request(descriptor.endpoint.method.clone(), &descriptor.endpoint.url)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache");

        for (name, value) in &descriptor.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }

        InFlight {
            pending: ProbeResult::pending(id, descriptor),
            request,
            timeout: self.timeout,
        }
    }
}

/// A probe that has been issued but not yet settled.
pub struct InFlight {
    pending: ProbeResult,
    request: RequestBuilder,
    timeout: Duration,
}

impl InFlight {
    pub fn pending(&self) -> &ProbeResult {
        &self.pending
    }

    /// Drive the request to a terminal result. Never fails.
    pub async fn settle(self) -> ProbeResult {
        let started = Instant::now();

        // Dropping the send future on expiry cancels the request.
        let outcome = match tokio::time::timeout(self.timeout, send(self.request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        };

        let elapsed = started.elapsed();

        match &outcome {
            Ok((status, _)) => tracing::debug!(
                "Probe {}/{} succeeded with {} in {:?}",
                self.pending.target,
                self.pending.probe_name,
                status,
                elapsed
            ),
            Err(e) => tracing::debug!(
                "Probe {}/{} failed in {:?}: {}",
                self.pending.target,
                self.pending.probe_name,
                elapsed,
                e
            ),
        }

        self.pending.settle(outcome, elapsed)
    }
}

async fn send(request: RequestBuilder) -> Result<(StatusCode, serde_json::Value), ProbeError> {
    let response = request.send().await.map_err(ProbeError::from_transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProbeError::from_status(status));
    }

    // Read the full body so elapsed time covers the complete transfer
    let body = response
        .bytes()
        .await
        .map_err(ProbeError::from_transport)?;

    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| ProbeError::Parse(e.to_string()))?
    };

    Ok((status, payload))
}
