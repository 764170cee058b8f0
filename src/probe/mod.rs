//! Probe module for endpoint testing.
//!
//! Holds the probe executor, the target availability checker and the
//! result record both of them produce.

mod health;
mod http;
mod result;

pub use health::*;
pub use http::*;
pub use result::*;

use std::time::Duration;
use thiserror::Error;

/// Probe error types.
///
/// None of these escape the executor; each one becomes a terminal
/// error result.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("HTTP {status} {reason}")]
    Http { status: u16, reason: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid JSON body: {0}")]
    Parse(String),
}

impl ProbeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Timeout(_) => ErrorKind::Timeout,
            ProbeError::Http { .. } => ErrorKind::Http,
            ProbeError::Network(_) => ErrorKind::Network,
            ProbeError::Parse(_) => ErrorKind::Parse,
        }
    }

    /// Convert a transport error, keeping the underlying cause in the message.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        ProbeError::Network(message)
    }

    pub(crate) fn from_status(status: reqwest::StatusCode) -> Self {
        ProbeError::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }
}

/// Build the HTTP client shared by the executor and the availability checker.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("probebench/", env!("CARGO_PKG_VERSION")))
        .build()
}
