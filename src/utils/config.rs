use crate::error::{ReportError, Result};
use serde::Deserialize;
use std::path::Path;

/// Report generation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Case name used for a request that failed before any check ran
    pub error_case_name: String,

    /// Case name for checks that carry neither expressions nor a description
    pub unnamed_case_name: String,

    /// Suite name for outcomes without a suitename or description
    pub default_suite_name: String,

    /// Spaces per nesting level in the XML output (0 disables pretty printing)
    pub indent: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            error_case_name: "Test suite has no errors".to_string(),
            unnamed_case_name: "Unnamed check".to_string(),
            default_suite_name: "default".to_string(),
            indent: 2,
        }
    }
}

impl ReportConfig {
    /// Load settings from a YAML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ReportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ReportConfig = serde_yaml::from_str(&content)?;
        log::debug!("Loaded report config from {}", path.display());
        Ok(config)
    }
}
