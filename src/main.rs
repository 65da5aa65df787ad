//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `dns_sentinel` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All probing is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::process;

use dns_sentinel::initialization::{init_crypto_provider, init_logger_with};
use dns_sentinel::{run_checks, Opt, OutputFormat, ResultRecord, Status};

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    let log_level = opt.log_level.clone();
    let log_format = opt.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    // Initialize crypto provider for TLS operations
    init_crypto_provider();

    match run_checks(&opt).await {
        Ok(report) => {
            for record in &report.records {
                print_record(record, &opt.output);
            }
            println!(
                "✅ Checked {} endpoint{} ({} up, {} down) in {:.1}s",
                report.endpoints,
                if report.endpoints == 1 { "" } else { "s" },
                report.up,
                report.down,
                report.elapsed_seconds
            );
            if opt.fail_on_down && report.down > 0 {
                process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("dns_sentinel error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Prints one result record to stdout in the requested format.
fn print_record(record: &ResultRecord, output: &OutputFormat) {
    match output {
        OutputFormat::Json => match serde_json::to_string(record) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("failed to serialize record for {}: {e}", record.url),
        },
        OutputFormat::Plain => {
            let verdict = match record.status {
                Status::Up => "up  ".green(),
                Status::Down => "down".red(),
            };
            let rtt = record
                .rtt
                .as_ref()
                .map(|rtt| format!(" rtt={}us", rtt.total_us))
                .unwrap_or_default();
            match &record.error {
                Some(problem) => println!("{} {}{} - {}", verdict, record.url, rtt, problem.message),
                None => println!("{} {}{}", verdict, record.url, rtt),
            }
        }
    }
}
