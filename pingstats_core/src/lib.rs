// This is the core library crate for pingstats.
// It holds the parsing, aggregation and report rendering for captured
// `ping` logs; the binary crate only wires it to the command line.

pub mod anomalies; // Slow replies, sequence gaps, out-of-order replies
pub mod config;    // Analysis configuration structures
pub mod error;
pub mod metrics;   // Logic for calculating metrics (loss, latency, jitter)
pub mod parser;    // Title detection and line ingestion
pub mod probe;     // Reply line definitions and parsing
pub mod reporter;  // Summary aggregation and text/JSON/HTML reports

pub use config::{AnalysisConfig, ReportFormat};
pub use error::{AnalysisError, Result};
pub use parser::ParsedLog;
pub use reporter::AnalysisSummary;

use std::path::Path;

/// Reads and summarizes one log file. `Ok(None)` when the file holds no reply records.
pub async fn analyze_file(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<Option<AnalysisSummary>> {
    config.validate()?;
    let path = path.as_ref();
    let log = parser::read_log(path, config).await?;
    Ok(reporter::generate_summary(path.display().to_string(), &log, config))
}

/// Same as [`analyze_file`] for a log piped on stdin.
pub async fn analyze_stdin(config: &AnalysisConfig) -> Result<Option<AnalysisSummary>> {
    config.validate()?;
    let log = parser::read_stdin(config).await?;
    Ok(reporter::generate_summary("<stdin>", &log, config))
}
