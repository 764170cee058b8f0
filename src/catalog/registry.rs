//! Probe descriptor registry.

use std::collections::HashSet;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, Url};

use super::models::*;
use super::CatalogError;

/// Immutable catalog of targets and their probes, in declaration order.
#[derive(Debug, Clone)]
pub struct Registry {
    targets: Vec<Target>,
    probes: Vec<ProbeDescriptor>,
}

impl Registry {
    /// Build a registry from a parsed catalog.
    pub fn from_catalog(catalog: CatalogFile) -> Result<Self, CatalogError> {
        if catalog.targets.is_empty() {
            return Err(CatalogError::Invalid("catalog declares no targets".to_string()));
        }

        let mut targets = Vec::with_capacity(catalog.targets.len());
        let mut probes = Vec::new();
        let mut seen_targets = HashSet::new();

        for spec in catalog.targets {
            if spec.id.trim().is_empty() {
                return Err(CatalogError::Invalid("target id cannot be empty".to_string()));
            }
            if spec.id == "all" {
                return Err(CatalogError::Invalid("target id \"all\" is reserved".to_string()));
            }
            if !seen_targets.insert(spec.id.clone()) {
                return Err(CatalogError::Invalid(format!("duplicate target id: {}", spec.id)));
            }

            let base = parse_base_url(&spec.id, &spec.base_url)?;
            let health_url = resolve(&base, &spec.health_path).map_err(|e| {
                CatalogError::Invalid(format!("target {}: bad health path: {}", spec.id, e))
            })?;

            let mut seen_probes = HashSet::new();
            for probe in spec.probes {
                if probe.name.trim().is_empty() {
                    return Err(CatalogError::Invalid(format!(
                        "target {}: probe name cannot be empty",
                        spec.id
                    )));
                }
                if !seen_probes.insert(probe.name.clone()) {
                    return Err(CatalogError::Invalid(format!(
                        "target {}: duplicate probe name: {}",
                        spec.id, probe.name
                    )));
                }
                probes.push(build_descriptor(&spec.id, &base, probe)?);
            }

            targets.push(Target {
                id: spec.id,
                name: spec.name,
                base_url: base.to_string(),
                health_url: health_url.to_string(),
            });
        }

        Ok(Self { targets, probes })
    }

    /// All targets in declaration order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Get a target by id.
    pub fn target(&self, id: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Probes in declaration order, optionally restricted to one target.
    pub fn list_probes(&self, target: Option<&str>) -> Vec<&ProbeDescriptor> {
        self.probes
            .iter()
            .filter(|p| target.map_or(true, |t| p.target == t))
            .collect()
    }

    /// Find a probe by target id and name.
    pub fn find_probe(&self, target: &str, name: &str) -> Option<&ProbeDescriptor> {
        self.probes
            .iter()
            .find(|p| p.target == target && p.name == name)
    }
}

fn parse_base_url(target_id: &str, raw: &str) -> Result<Url, CatalogError> {
    let url = Url::parse(raw).map_err(|e| {
        CatalogError::Invalid(format!("target {}: bad base URL {}: {}", target_id, raw, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(CatalogError::Invalid(format!(
            "target {}: unsupported scheme {}",
            target_id,
            url.scheme()
        )));
    }

    Ok(url)
}

/// Resolve a probe path against the base URL. Absolute URLs pass through.
fn resolve(base: &Url, path: &str) -> Result<Url, String> {
    if let Ok(absolute) = Url::parse(path) {
        return Ok(absolute);
    }
    base.join(path).map_err(|e| e.to_string())
}

fn build_descriptor(
    target_id: &str,
    base: &Url,
    spec: ProbeSpec,
) -> Result<ProbeDescriptor, CatalogError> {
    let invalid = |what: String| {
        CatalogError::Invalid(format!("target {}: probe {}: {}", target_id, spec.name, what))
    };

    let url = resolve(base, &spec.path).map_err(|e| invalid(format!("bad path: {}", e)))?;

    let method = Method::from_bytes(spec.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| invalid(format!("bad method: {}", spec.method)))?;

    for (name, value) in &spec.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| invalid(format!("bad header name: {}", name)))?;
        HeaderValue::from_str(value)
            .map_err(|_| invalid(format!("bad value for header {}", name)))?;
    }

    Ok(ProbeDescriptor {
        name: spec.name.clone(),
        target: target_id.to_string(),
        endpoint: Endpoint {
            method,
            url: url.to_string(),
        },
        description: spec.description.clone(),
        headers: spec.headers.clone(),
        body: spec.body.clone(),
    })
}
