use clap::{ArgAction, Parser};
use pingstats_core::config::DEFAULT_THRESHOLD_MS;
use pingstats_core::{reporter, AnalysisConfig, ReportFormat};
use std::path::{Path, PathBuf};

/// Summarize latency, loss and jitter from a captured `ping` log
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Opts {
    /// Path to PING log file, `-` reads the log from stdin
    pub file_path: PathBuf,
    /// Value in milliseconds. Replies below it are acceptable, replies above are too high
    #[arg(short, long, value_name = "MILLISECONDS", default_value_t = DEFAULT_THRESHOLD_MS, value_parser = threshold)]
    pub threshold: f64,
    /// Skip PING log title
    #[arg(short, long, alias = "skip_title")]
    pub skip_title: bool,
    /// Report format: text, json or html
    #[arg(short, long, default_value = "text")]
    pub format: ReportFormat,
    /// Where to write the report (default: <log>_analyzed.<ext> next to the log)
    #[arg(short, long, conflicts_with = "stdout")]
    pub output: Option<PathBuf>,
    /// Print the report instead of writing it to a file
    #[arg(long)]
    pub stdout: bool,
    /// Show `ping -D` timestamps in UTC instead of local time
    #[arg(long)]
    pub utc: bool,
    /// More logging on stderr (-v debug, -vv trace). RUST_LOG overrides it
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

pub enum Destination {
    Stdout,
    File(PathBuf),
}

fn threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("'{s}' must be a non-negative number of milliseconds"))
    }
}

impl Opts {
    pub fn reads_stdin(&self) -> bool {
        self.file_path == Path::new("-")
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            threshold_ms: self.threshold,
            skip_title: self.skip_title,
            format: self.format,
            utc_timestamps: self.utc,
        }
    }

    pub fn destination(&self) -> Destination {
        match &self.output {
            Some(path) => Destination::File(path.clone()),
            None if self.stdout || self.reads_stdin() => Destination::Stdout,
            None => Destination::File(reporter::default_output_path(&self.file_path, self.format)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Opts::try_parse_from(["pingstats", "ping.log"]).unwrap();
        assert_eq!(opts.threshold, 1.0);
        assert!(!opts.skip_title);
        assert_eq!(opts.format, ReportFormat::Text);
        assert!(matches!(opts.destination(), Destination::File(p) if p == Path::new("ping_analyzed.txt")));
    }

    #[test]
    fn test_flags() {
        let opts = Opts::try_parse_from([
            "pingstats", "logs/ping.log", "-t", "25.5", "--skip_title", "-f", "json", "--utc", "-vv",
        ])
        .unwrap();
        let config = opts.analysis_config();
        assert_eq!(config.threshold_ms, 25.5);
        assert!(config.skip_title);
        assert!(config.utc_timestamps);
        assert_eq!(config.format, ReportFormat::Json);
        assert_eq!(opts.verbose, 2);
        assert!(matches!(opts.destination(), Destination::File(p) if p == Path::new("logs/ping_analyzed.json")));
    }

    #[test]
    fn test_stdin_defaults_to_stdout() {
        let opts = Opts::try_parse_from(["pingstats", "-"]).unwrap();
        assert!(opts.reads_stdin());
        assert!(matches!(opts.destination(), Destination::Stdout));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Opts::try_parse_from(["pingstats", "ping.log", "-t", "-3"]).is_err());
        assert!(Opts::try_parse_from(["pingstats", "ping.log", "-f", "xml"]).is_err());
        assert!(Opts::try_parse_from(["pingstats", "ping.log", "-o", "out.txt", "--stdout"]).is_err());
    }
}
