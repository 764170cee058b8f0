//! Built-in catalog for the two demo backends.

use super::models::{CatalogFile, ProbeSpec, TargetSpec};

/// The catalog used when no catalog file is configured.
///
/// `flask` is the feature-rich API on port 5001, `simple` the minimal
/// HTTP server on port 5002.
pub fn default_catalog() -> CatalogFile {
    CatalogFile {
        targets: vec![
            TargetSpec {
                id: "flask".to_string(),
                name: "Flask API".to_string(),
                base_url: "http://localhost:5001".to_string(),
                health_path: "/api/health".to_string(),
                probes: vec![
                    probe("Health Check", "/api/health", "Comprehensive health status"),
                    probe("Server Status", "/api/status", "Detailed server metrics"),
                    probe("Run Test", "/api/test?type=advanced&delay=0.5", "Configurable test"),
                    probe("Get Metrics", "/api/metrics", "Performance metrics"),
                    probe("Simulate Delay", "/api/simulation/delay", "Delay simulation"),
                ],
            },
            TargetSpec {
                id: "simple".to_string(),
                name: "Simple API".to_string(),
                base_url: "http://localhost:5002".to_string(),
                health_path: "/api/health".to_string(),
                probes: vec![
                    probe("Health Check", "/api/health", "Basic health status"),
                    probe("Quick Test", "/api/quick-test", "Fast performance test"),
                    probe("Ping", "/api/ping", "Simple ping/pong"),
                    probe("Server Info", "/api/info", "Server information"),
                ],
            },
        ],
    }
}

fn probe(name: &str, path: &str, description: &str) -> ProbeSpec {
    ProbeSpec {
        name: name.to_string(),
        path: path.to_string(),
        description: description.to_string(),
        method: "GET".to_string(),
        headers: Default::default(),
        body: None,
    }
}
