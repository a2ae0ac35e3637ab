use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading results or producing reports
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid results JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid report config: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("XML serialization failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("serialized report is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;
