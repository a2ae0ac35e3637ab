use super::summary::SummaryCounts;
use super::types::RequestOutcome;
use crate::error::{ReportError, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: SummaryCounts,
    results: &'a [RequestOutcome],
}

/// Render the summary and raw outcomes as pretty JSON
pub fn generate_json(results: &[RequestOutcome], summary: SummaryCounts) -> Result<String> {
    let json = serde_json::to_string_pretty(&JsonReport { summary, results })?;
    Ok(json)
}

/// Write JSON report
pub fn write_report(results: &[RequestOutcome], summary: SummaryCounts, path: &Path) -> Result<()> {
    let json = generate_json(results, summary)?;
    std::fs::write(path, json).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    println!("    Generated JSON report: {}", path.display());
    Ok(())
}
