use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use nexus_report::{report, utils::config::ReportConfig};

#[derive(Parser)]
#[command(name = "nexus-report")]
#[command(author = "NL Team")]
#[command(version = "0.1.3")]
#[command(about = "Summaries and JUnit reports for API request runs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print pass/fail counts for a results file
    Summary {
        /// Path to results JSON
        results: PathBuf,
    },

    /// Generate report from run results
    Report {
        /// Path to results JSON
        results: PathBuf,

        /// Output format (junit, json)
        #[arg(short, long, default_value = "junit")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report config (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let summary = match cli.command {
        Commands::Summary { results } => {
            let outcomes = report::load_results(&results)?;
            report::summarize(&outcomes)
        }

        Commands::Report {
            results,
            format,
            output,
            config,
        } => {
            let config = match config {
                Some(path) => ReportConfig::load(&path)?,
                None => ReportConfig::default(),
            };

            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref(), &config)?
        }
    };

    report::print_summary(&summary);

    if summary.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}
