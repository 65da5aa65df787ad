//! Command-line options, probe-file model, and the constants used as
//! defaults across the crate.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Deserialize;

// constants (used as defaults)
/// Default DNS port when an endpoint descriptor omits one.
pub const DEFAULT_DNS_PORT: u16 = 53;
/// Default exchange deadline in seconds, dialing included.
pub const DEFAULT_EXCHANGE_TIMEOUT_SECS: u64 = 16;
/// Largest datagram the plain transport will accept.
pub const MAX_UDP_PAYLOAD: usize = 4096;
/// Default number of jobs allowed to run at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

// Endpoint host resolution
/// Resolver lookup timeout in seconds
pub const DNS_TIMEOUT_SECS: u64 = 10;
/// Resolver attempts before a lookup gives up
pub const DNS_ATTEMPTS: usize = 2;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to
/// most verbose (Trace). Used with the `--log-level` CLI option.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Result record output format for stdout.
#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    /// One human-readable line per record.
    Plain,
    /// One JSON object per line.
    Json,
}

/// Command-line options.
///
/// This struct is automatically generated by `clap` from the field
/// attributes.
///
/// # Examples
///
/// ```bash
/// # Basic usage
/// dns_sentinel probes.yml
///
/// # Machine-readable records, non-zero exit when anything is down
/// dns_sentinel probes.yml --output json --fail-on-down
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "dns_sentinel",
    about = "Actively checks DNS endpoints and reports one result per endpoint."
)]
pub struct Opt {
    /// Probes file to read (YAML)
    #[arg(value_parser)]
    pub file: PathBuf,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Record output format: plain|json
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    pub output: OutputFormat,

    /// Maximum jobs running at once
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONCURRENCY,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_concurrency: usize,

    /// Exit non-zero when any endpoint is down
    #[arg(long)]
    pub fail_on_down: bool,
}

/// Top-level probes file model.
#[derive(Debug, Deserialize)]
pub struct FileConfig {
    /// Probe entries, built through the registry in order.
    pub probes: Vec<ProbeEntry>,
}

/// One probe entry: its type, an optional instance name, and the raw
/// settings block the factory consumes.
#[derive(Debug, Deserialize)]
pub struct ProbeEntry {
    /// Probe type, the registry key.
    #[serde(rename = "type")]
    pub kind: String,
    /// Instance name; defaults to the probe type.
    #[serde(default)]
    pub name: Option<String>,
    /// Everything else in the entry, handed to the factory untouched.
    #[serde(flatten)]
    pub settings: serde_yaml::Value,
}

impl FileConfig {
    /// Loads and parses a probes file.
    pub fn load(path: &Path) -> anyhow::Result<FileConfig> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read probes file {}", path.display()))?;
        let config: FileConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse probes file {}", path.display()))?;
        Ok(config)
    }
}

impl ProbeEntry {
    /// Instance name, falling back to the probe type.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }
}
