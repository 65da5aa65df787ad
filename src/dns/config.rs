//! Probe configuration.
//!
//! The settings block one `dns` probe entry carries, and the validation
//! pass that collects every problem in it before anything is built.

use std::collections::HashSet;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use hickory_proto::rr::Name;
use serde::Deserialize;

use crate::config::DEFAULT_EXCHANGE_TIMEOUT_SECS;
use crate::dns::answer::RecordKind;
use crate::dns::endpoint::{DnsEndpoint, Scheme};
use crate::error::{ConfigError, ConfigErrors};
use crate::tls::TlsSettings;

/// Configuration block for one DNS probe.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DnsProbeConfig {
    /// Endpoint descriptors to probe, one job each.
    pub dns_servers: Vec<String>,
    /// Name the query asks for.
    pub target: String,
    /// Exchange deadline in seconds, dialing included.
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
    /// Expectations checked against each response.
    #[serde(default)]
    pub check: CheckConfig,
    /// Encrypted-transport settings; presence turns TLS on.
    #[serde(default)]
    pub ssl: Option<TlsSettings>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_EXCHANGE_TIMEOUT_SECS
}

/// Container for the `check.response` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    /// Expectations on the decoded response.
    #[serde(default)]
    pub response: ResponseExpectation,
}

/// Response expectations as written in the config file.
///
/// Empty strings mean "no assertion"; `expected_answer` turns them into
/// `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseExpectation {
    /// Require the authoritative-answer flag on the response header.
    #[serde(default)]
    pub authoritative: bool,
    /// Expected record type tag (`a`, `aaaa`, `cname`, `txt`).
    #[serde(default)]
    pub record_type: String,
    /// Expected record value.
    #[serde(default)]
    pub value: String,
}

/// Normalized expectations the validator works with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedAnswer {
    /// Expected record value, lower-cased. `None` means no assertion.
    pub value: Option<String>,
    /// Expected record type. `None` means no assertion.
    pub record_type: Option<RecordKind>,
    /// Whether the response must be authoritative.
    pub authoritative: bool,
}

impl DnsProbeConfig {
    /// Validates the whole block, collecting every problem instead of
    /// stopping at the first one.
    pub fn validate(&self) -> Result<(), ConfigErrors> {
        let mut problems = ConfigErrors::new();

        if self.dns_servers.is_empty() {
            problems.push(ConfigError::NoServers);
        }

        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for descriptor in &self.dns_servers {
            if !seen.insert(descriptor.as_str()) {
                duplicates.push(descriptor.as_str());
            }
            match DnsEndpoint::parse(descriptor) {
                Ok(endpoint) => {
                    if !is_ip_or_hostname(&endpoint.host) {
                        problems.push(ConfigError::InvalidServer(endpoint.host.clone()));
                    }
                    if self.ssl.is_some() && endpoint.scheme == Scheme::Udp {
                        problems.push(ConfigError::TlsOverUdp(endpoint.url.clone()));
                    }
                }
                Err(problem) => problems.push(problem),
            }
        }
        if !duplicates.is_empty() {
            problems.push(ConfigError::Duplicates(duplicates.join(", ")));
        }

        if self.target.is_empty() {
            problems.push(ConfigError::MissingTarget);
        } else if let Err(source) = Name::from_ascii(&self.target) {
            problems.push(ConfigError::InvalidTarget {
                target: self.target.clone(),
                source,
            });
        }

        if self.timeout == 0 {
            problems.push(ConfigError::InvalidTimeout);
        }

        let record_type = self.check.response.record_type.trim();
        if !record_type.is_empty() && RecordKind::from_str(record_type).is_err() {
            problems.push(ConfigError::UnknownRecordType(record_type.to_string()));
        }

        problems.into_result()
    }

    /// Exchange deadline as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Normalized expectations. Meaningful after `validate` passed.
    pub fn expected_answer(&self) -> ExpectedAnswer {
        let value = self.check.response.value.trim().to_lowercase();
        ExpectedAnswer {
            value: if value.is_empty() { None } else { Some(value) },
            record_type: RecordKind::from_str(self.check.response.record_type.trim()).ok(),
            authoritative: self.check.response.authoritative,
        }
    }
}

/// Accepts an IP literal or a well-formed host name.
fn is_ip_or_hostname(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok() || is_valid_hostname(host)
}

/// Host name rule: at most 255 characters, dot-separated labels of 1-63
/// characters drawn from letters, digits, and hyphens. The final label
/// must contain a letter so a malformed dotted-quad is not mistaken for a
/// host name.
fn is_valid_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > 255 {
        return false;
    }
    let name = host.strip_suffix('.').unwrap_or(host);
    let mut last_label = "";
    for label in name.split('.') {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if !label
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-')
        {
            return false;
        }
        last_label = label;
    }
    last_label.bytes().any(|byte| byte.is_ascii_alphabetic())
}
