pub mod error;
pub mod report;
pub mod utils;

// Re-export common items
pub use error::ReportError;
pub use report::junit::{build_report, write_report, JUnitDocument};
pub use report::{generate_report, summarize, RequestOutcome, SummaryCounts};
pub use utils::config::ReportConfig;
