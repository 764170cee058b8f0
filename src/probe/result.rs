//! Probe result record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use super::ProbeError;
use crate::catalog::ProbeDescriptor;

/// Lifecycle state of a probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeState {
    Pending,
    Success,
    Error,
}

/// Cause of an error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Timeout,
    Http,
    Network,
    Parse,
}

/// Record of one probe invocation.
///
/// Created pending; settles exactly once into success or error.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub id: u64,
    pub probe_name: String,
    pub target: String,
    pub state: ProbeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub elapsed_ms: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub observed_at: DateTime<Utc>,
}

impl ProbeResult {
    pub fn pending(id: u64, descriptor: &ProbeDescriptor) -> Self {
        Self {
            id,
            probe_name: descriptor.name.clone(),
            target: descriptor.target.clone(),
            state: ProbeState::Pending,
            error_kind: None,
            elapsed_ms: 0,
            message: "Testing...".to_string(),
            payload: None,
            observed_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state != ProbeState::Pending
    }

    /// Consume a pending result and produce its terminal replacement.
    pub(crate) fn settle(
        self,
        outcome: Result<(reqwest::StatusCode, serde_json::Value), ProbeError>,
        elapsed: Duration,
    ) -> Self {
        let (state, error_kind, message, payload) = match outcome {
            Ok((status, body)) => (
                ProbeState::Success,
                None,
                format!("{} - Success", status),
                Some(body),
            ),
            Err(e) => (ProbeState::Error, Some(e.kind()), e.to_string(), None),
        };

        Self {
            state,
            error_kind,
            elapsed_ms: elapsed.as_millis() as u64,
            message,
            payload,
            observed_at: Utc::now(),
            ..self
        }
    }
}
