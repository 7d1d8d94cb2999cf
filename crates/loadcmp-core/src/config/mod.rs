//! Analysis configuration: which endpoints to read and how to classify them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::LatencyThresholds;
use crate::engine::aggregator::DEFAULT_CHECK_NAME;
use crate::error::LoadcmpError;

/// One named endpoint and the structured log captured for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EndpointSource {
    pub name: String,
    pub log_path: PathBuf,
}

impl EndpointSource {
    pub fn new(name: impl Into<String>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            log_path: log_path.into(),
        }
    }
}

/// Settings for an analysis pass. Every field has a default, so `{}` is a
/// valid config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisConfig {
    /// Endpoints in report order. Ties in ranking go to the earlier one.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointSource>,
    /// Substring identifying the check that feeds the success rate.
    #[serde(default = "default_check_name")]
    pub check_name: String,
    #[serde(default)]
    pub latency_thresholds: LatencyThresholds,
}

fn default_endpoints() -> Vec<EndpointSource> {
    ["old", "random", "static"]
        .into_iter()
        .map(|name| EndpointSource::new(name, format!("results_{name}.json")))
        .collect()
}

fn default_check_name() -> String {
    DEFAULT_CHECK_NAME.to_string()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            check_name: default_check_name(),
            latency_thresholds: LatencyThresholds::default(),
        }
    }
}

impl AnalysisConfig {
    /// Check the config and return every problem found.
    ///
    /// An empty `Vec` means the config is valid.
    pub fn validate(&self) -> Vec<LoadcmpError> {
        let mut errors = Vec::new();

        if self.endpoints.is_empty() {
            errors.push(LoadcmpError::Validation(
                "At least one endpoint must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.name.trim().is_empty() {
                errors.push(LoadcmpError::Validation(format!(
                    "Endpoint with log '{}' has an empty name",
                    endpoint.log_path.display()
                )));
            } else if !seen.insert(endpoint.name.as_str()) {
                errors.push(LoadcmpError::Validation(format!(
                    "Endpoint '{}' is configured more than once",
                    endpoint.name
                )));
            }
        }

        if self.check_name.trim().is_empty() {
            errors.push(LoadcmpError::Validation(
                "check_name must not be empty".to_string(),
            ));
        }

        let t = &self.latency_thresholds;
        if !(t.warn_ms.is_finite() && t.fail_ms.is_finite() && t.warn_ms < t.fail_ms) {
            errors.push(LoadcmpError::Validation(format!(
                "latency_thresholds.warn_ms ({}) must be below fail_ms ({})",
                t.warn_ms, t.fail_ms
            )));
        }

        errors
    }

    /// Like [`validate`](Self::validate) but fails on the first problem.
    pub fn ensure_valid(&self) -> Result<(), LoadcmpError> {
        match self.validate().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Read and validate a JSON config file.
pub async fn read_config(path: impl AsRef<Path>) -> Result<AnalysisConfig, LoadcmpError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let config: AnalysisConfig = serde_json::from_str(&content)
        .map_err(|e| LoadcmpError::Config(format!("{}: {e}", path.display())))?;
    config.ensure_valid()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
