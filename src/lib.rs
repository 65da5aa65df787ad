//! dns_sentinel library: active DNS endpoint checking
//!
//! Sends one DNS query per configured endpoint, decodes the answers it
//! understands, checks them against operator expectations, and reports
//! one structured result record per endpoint with timing and failure
//! classification.
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use dns_sentinel::{run_checks, Opt};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let opt = Opt::parse_from(["dns_sentinel", "probes.yml"]);
//!
//! let report = run_checks(&opt).await?;
//! println!("Checked {} endpoints: {} up, {} down",
//!          report.endpoints, report.up, report.down);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or call library functions within an async context.

#![warn(missing_docs)]

pub mod config;
mod dns;
mod error;
pub mod initialization;
mod registry;
mod report;
mod stats;
mod timing;
mod tls;

// Re-export public API
pub use config::{FileConfig, LogFormat, LogLevel, Opt, OutputFormat, ProbeEntry};
pub use dns::answer::{DnsAnswer, RecordKind};
pub use dns::endpoint::{DnsEndpoint, Scheme};
pub use dns::job::Job;
pub use error::{
    ConfigError, ConfigErrors, ErrorKind, FailureClass, InitializationError, MismatchError,
    ProbeError,
};
pub use registry::{FactoryFn, Plugin, Registry};
pub use report::{ErrorInfo, ResolveInfo, ResponseInfo, ResultRecord, RttInfo, Status};
pub use run::{run_checks, CheckReport};
pub use timing::{RttSample, TimingTrace};
pub use tls::{TlsSession, TlsSettings};

// Internal run module (drives one pass over every configured probe)
mod run {
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use futures::stream::FuturesUnordered;
    use futures::StreamExt;
    use log::{info, warn};

    use crate::config::{FileConfig, Opt};
    use crate::dns::job::Job;
    use crate::initialization::init_semaphore;
    use crate::registry::Registry;
    use crate::report::{ResultRecord, Status};
    use crate::stats::{print_error_statistics, ErrorStats};

    /// Results of one checking pass.
    #[derive(Debug, Clone)]
    pub struct CheckReport {
        /// Number of endpoint jobs that ran
        pub endpoints: usize,
        /// Endpoints that came back up
        pub up: usize,
        /// Endpoints that came back down
        pub down: usize,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
        /// Every record produced, in completion order
        pub records: Vec<ResultRecord>,
    }

    /// Runs every configured probe once.
    ///
    /// Loads the probes file, builds each entry through the registry, runs
    /// all jobs concurrently bounded by `max_concurrency`, and collects one
    /// record per endpoint. Construction problems abort the pass with an
    /// error; per-tick failures end up inside the records instead.
    pub async fn run_checks(opt: &Opt) -> Result<CheckReport> {
        let config = FileConfig::load(&opt.file)?;
        info!(
            "Loaded {} probe(s) from {}",
            config.probes.len(),
            opt.file.display()
        );

        let registry = Registry::with_defaults();
        let mut jobs: Vec<Box<dyn Job>> = Vec::new();
        for entry in &config.probes {
            let name = entry.name();
            let plugin = registry
                .create(&entry.kind, name, &entry.settings)
                .with_context(|| format!("Failed to build probe '{}'", name))?;
            info!("Probe '{}': {} endpoint(s)", name, plugin.endpoints);
            jobs.extend(plugin.jobs);
        }

        let start_time = std::time::Instant::now();
        let semaphore = init_semaphore(opt.max_concurrency);
        let error_stats = Arc::new(ErrorStats::new());

        let mut tasks = FuturesUnordered::new();
        for job in jobs {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Semaphore closed, skipping endpoint: {}", job.url());
                    continue;
                }
            };

            let stats = Arc::clone(&error_stats);
            tasks.push(tokio::spawn(async move {
                let _permit = permit;

                let record = job.run().await;
                if let Some(problem) = &record.error {
                    stats.increment(problem.kind);
                }
                record
            }));
        }

        let mut records = Vec::new();
        while let Some(task_result) = tasks.next().await {
            match task_result {
                Ok(record) => records.push(record),
                Err(join_error) => warn!("Job panicked: {:?}", join_error),
            }
        }

        let elapsed_seconds = start_time.elapsed().as_secs_f64();
        let up = records
            .iter()
            .filter(|record| record.status == Status::Up)
            .count();
        let down = records.len() - up;

        print_error_statistics(&error_stats);

        Ok(CheckReport {
            endpoints: records.len(),
            up,
            down,
            elapsed_seconds,
            records,
        })
    }
}
