//! The DNS probe.
//!
//! Sends one `ANY` query per tick to each configured endpoint, decodes
//! the answers it understands, checks them against the configured
//! expectations, and reports one structured result record per endpoint.

pub mod answer;
pub mod check;
pub mod config;
pub mod endpoint;
pub mod exchange;
pub mod job;

use std::sync::Arc;

use hickory_proto::rr::Name;
use log::debug;

use crate::error::{ConfigError, ConfigErrors};
use crate::initialization::{init_crypto_provider, init_resolver};
use crate::registry::Plugin;
use crate::tls::TlsMaterial;

use self::config::DnsProbeConfig;
use self::endpoint::DnsEndpoint;
use self::job::{DnsJob, Job};

/// Builds a DNS probe plugin from its raw settings block.
///
/// Validation collects every problem before giving up; nothing is built
/// unless the whole block is sound. TLS material is loaded once and
/// shared read-only by all jobs, and each configured endpoint gets
/// exactly one job.
pub fn create(name: &str, settings: &serde_yaml::Value) -> Result<Plugin, ConfigErrors> {
    let config: DnsProbeConfig =
        serde_yaml::from_value(settings.clone()).map_err(ConfigError::Parse)?;
    config.validate()?;

    let tls = match &config.ssl {
        Some(settings) => {
            init_crypto_provider();
            Some(Arc::new(TlsMaterial::load(settings)?))
        }
        None => None,
    };

    // validate() already confirmed the target parses
    let mut target = Name::from_ascii(&config.target).map_err(|source| {
        ConfigError::InvalidTarget {
            target: config.target.clone(),
            source,
        }
    })?;
    target.set_fqdn(true);

    let resolver = init_resolver();
    let timeout = config.timeout();
    let expect = config.expected_answer();

    let mut jobs: Vec<Box<dyn Job>> = Vec::with_capacity(config.dns_servers.len());
    for descriptor in &config.dns_servers {
        let endpoint = DnsEndpoint::parse(descriptor)?;
        debug!("probe '{}': job for {}", name, endpoint.url);
        jobs.push(Box::new(DnsJob::new(
            name.to_string(),
            endpoint,
            target.clone(),
            timeout,
            expect.clone(),
            tls.clone(),
            Arc::clone(&resolver),
        )));
    }

    let endpoints = jobs.len();
    Ok(Plugin { jobs, endpoints })
}
