//! Catalog model types.

use reqwest::Method;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::Path;

use super::CatalogError;

/// A backend service under test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub id: String,
    pub name: String,
    pub base_url: String,
    /// Fully-qualified URL of the availability check.
    pub health_url: String,
}

/// Request locator for a probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    pub url: String,
}

#[cfg(test)]
impl Endpoint {
    pub fn get(url: &str) -> Self {
        Self {
            method: Method::GET,
            url: url.to_string(),
        }
    }
}

/// Immutable definition of one testable operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeDescriptor {
    pub name: String,
    pub target: String,
    pub endpoint: Endpoint,
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

fn serialize_method<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(method.as_str())
}

// ============================================================================
// Catalog file format
// ============================================================================

/// On-disk catalog, as read from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    pub targets: Vec<TargetSpec>,
}

impl CatalogFile {
    /// Read a catalog from a JSON file. Validation happens in the registry.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Replace the base URL of the target with the given id.
    ///
    /// Returns false if no such target exists.
    pub fn override_base_url(&mut self, target_id: &str, base_url: &str) -> bool {
        match self.targets.iter_mut().find(|t| t.id == target_id) {
            Some(target) => {
                target.base_url = base_url.to_string();
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    pub id: String,
    pub name: String,
    pub base_url: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default)]
    pub probes: Vec<ProbeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSpec {
    pub name: String,
    /// Path relative to the target's base URL, or an absolute URL.
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

fn default_health_path() -> String {
    "/api/health".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}
