mod args;

use anyhow::{Context, Result};
use clap::Parser;
use pingstats_core::reporter;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let opts = args::Opts::parse();
    init_logging(opts.verbose);

    let config = opts.analysis_config();
    tracing::debug!(?config, input = %opts.file_path.display(), "analyzing ping log");
    let summary = if opts.reads_stdin() {
        pingstats_core::analyze_stdin(&config).await?
    } else {
        pingstats_core::analyze_file(&opts.file_path, &config).await?
    };

    let Some(summary) = summary else {
        println!(
            "No PING log records found in provided file: {}",
            opts.file_path.display()
        );
        return Ok(());
    };

    let report = reporter::render(&summary, config.format)?;
    match opts.destination() {
        args::Destination::Stdout => println!("{report}"),
        args::Destination::File(path) => {
            tokio::fs::write(&path, report)
                .await
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            println!("Analyze results saved to {}", path.display());
        }
    }
    Ok(())
}

// Logs go to stderr so a report printed on stdout stays clean.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
