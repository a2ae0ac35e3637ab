pub mod json;
pub mod junit;
pub mod summary;
pub mod types;

use crate::error::{ReportError, Result};
use crate::utils::config::ReportConfig;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use summary::{print_summary, summarize, SummaryCounts};
pub use types::RequestOutcome;

/// Output format for `generate_report`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Junit,
    Json,
}

impl ReportFormat {
    pub fn default_output(self) -> PathBuf {
        match self {
            ReportFormat::Junit => PathBuf::from("junit.xml"),
            ReportFormat::Json => PathBuf::from("results.json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "junit" | "xml" => Ok(ReportFormat::Junit),
            "json" => Ok(ReportFormat::Json),
            _ => Err(ReportError::UnknownFormat(s.to_string())),
        }
    }
}

/// Load request outcomes from a results JSON file
pub fn load_results(results_path: &Path) -> Result<Vec<RequestOutcome>> {
    let content = std::fs::read_to_string(results_path).map_err(|source| ReportError::Read {
        path: results_path.to_path_buf(),
        source,
    })?;
    let file: types::ResultsFile = serde_json::from_str(&content)?;
    let outcomes = file.into_outcomes();
    log::debug!(
        "Loaded {} request outcomes from {}",
        outcomes.len(),
        results_path.display()
    );
    Ok(outcomes)
}

/// Generate report from a results file.
///
/// Returns the run summary so callers can decide on an exit status.
pub fn generate_report(
    results_path: &Path,
    format: &str,
    output: Option<&Path>,
    config: &ReportConfig,
) -> Result<SummaryCounts> {
    let format: ReportFormat = format.parse()?;
    let results = load_results(results_path)?;
    let summary = summarize(&results);

    let default_output = format.default_output();
    let output = output.unwrap_or(&default_output);

    match format {
        ReportFormat::Junit => {
            let doc = junit::build_report(&results, config);
            junit::write_report(&doc, output, config)?;
        }
        ReportFormat::Json => json::write_report(&results, summary, output)?,
    }

    Ok(summary)
}
