pub mod config;

pub use config::ReportConfig;
