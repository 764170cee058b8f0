//! Probe catalog for probebench.
//!
//! Declares the targets under test and the probes grouped under each one.

mod defaults;
mod models;
mod registry;

pub use defaults::*;
pub use models::*;
pub use registry::*;

use thiserror::Error;

/// Catalog error types.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}
