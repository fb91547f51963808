// Analysis configuration structures

use crate::error::{AnalysisError, Result};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_THRESHOLD_MS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Html,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportFormat::Text => "text",
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
        };
        f.write_str(name)
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            other => Err(format!("unknown report format '{other}' (expected text, json or html)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Replies with an RTT strictly above this value are reported as too high.
    pub threshold_ms: f64,
    /// Don't look for the `PING host (ip) ...` header line.
    pub skip_title: bool,
    pub format: ReportFormat,
    /// Render `ping -D` timestamps in UTC instead of the local timezone.
    pub utc_timestamps: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            threshold_ms: DEFAULT_THRESHOLD_MS,
            skip_title: false,
            format: ReportFormat::Text,
            utc_timestamps: false,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_ms.is_finite() || self.threshold_ms < 0.0 {
            return Err(AnalysisError::InvalidThreshold(self.threshold_ms));
        }
        Ok(())
    }
}
