//! Probe jobs.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hickory_proto::rr::Name;
use hickory_resolver::TokioAsyncResolver;
use log::{debug, warn};

use crate::dns::check::check_response;
use crate::dns::config::ExpectedAnswer;
use crate::dns::endpoint::DnsEndpoint;
use crate::dns::exchange::{exchange, ExchangeResult};
use crate::error::ProbeError;
use crate::report::{ResolveInfo, ResponseInfo, ResultRecord, RttInfo};
use crate::timing::micros;
use crate::tls::TlsMaterial;

/// A single scheduled unit of probing work.
///
/// One invocation produces exactly one result record. Failures are
/// classified into the record instead of surfacing as errors, so a run
/// over many jobs never aborts halfway.
#[async_trait]
pub trait Job: Send + Sync {
    /// Canonical URL of the endpoint this job probes.
    fn url(&self) -> &str;

    /// Runs one tick.
    async fn run(&self) -> ResultRecord;
}

/// DNS probe job for one endpoint.
pub struct DnsJob {
    probe: String,
    endpoint: DnsEndpoint,
    target: Name,
    timeout: Duration,
    expect: ExpectedAnswer,
    tls: Option<Arc<TlsMaterial>>,
    resolver: Arc<TokioAsyncResolver>,
}

impl DnsJob {
    pub(crate) fn new(
        probe: String,
        endpoint: DnsEndpoint,
        target: Name,
        timeout: Duration,
        expect: ExpectedAnswer,
        tls: Option<Arc<TlsMaterial>>,
        resolver: Arc<TokioAsyncResolver>,
    ) -> Self {
        DnsJob {
            probe,
            endpoint,
            target,
            timeout,
            expect,
            tls,
            resolver,
        }
    }

    /// Turns the endpoint host into an address. IP literals pass through;
    /// anything else goes through the shared resolver, first address wins.
    async fn resolve(&self) -> Result<(IpAddr, ResolveInfo), ProbeError> {
        if let Ok(ip) = self.endpoint.host.parse::<IpAddr>() {
            return Ok((
                ip,
                ResolveInfo {
                    ip: ip.to_string(),
                    rtt_us: None,
                },
            ));
        }

        let lookup_start = Instant::now();
        let lookup = self
            .resolver
            .lookup_ip(self.endpoint.host.as_str())
            .await
            .map_err(|source| ProbeError::Resolve {
                host: self.endpoint.host.clone(),
                source,
            })?;
        let elapsed = lookup_start.elapsed();
        let ip = lookup.iter().next().ok_or_else(|| ProbeError::NoAddresses {
            host: self.endpoint.host.clone(),
        })?;
        debug!("resolved {} to {} in {}us", self.endpoint.host, ip, micros(elapsed));

        Ok((
            ip,
            ResolveInfo {
                ip: ip.to_string(),
                rtt_us: Some(micros(elapsed)),
            },
        ))
    }
}

#[async_trait]
impl Job for DnsJob {
    fn url(&self) -> &str {
        &self.endpoint.url
    }

    async fn run(&self) -> ResultRecord {
        let tick = Instant::now();
        let mut record = ResultRecord::new(self.probe.clone(), self.endpoint.url.clone());

        let ip = match self.resolve().await {
            Ok((ip, resolve)) => {
                record.resolve = Some(resolve);
                ip
            }
            Err(problem) => {
                warn!("{}: {}", self.endpoint.url, problem);
                record.fail(&problem);
                record.duration_us = micros(tick.elapsed());
                return record;
            }
        };

        let outcome = exchange(
            &self.endpoint,
            ip,
            &self.target,
            self.timeout,
            self.tls.as_deref(),
        )
        .await;

        match outcome.result {
            Ok(response) => {
                record.rtt = Some(RttInfo::from(outcome.trace.rtt()));
                if let Err(mismatch) = check_response(&response, &self.expect) {
                    let problem = ProbeError::from(mismatch);
                    warn!("{}: {}", self.endpoint.url, problem);
                    record.fail(&problem);
                }
                let ExchangeResult {
                    server,
                    authoritative,
                    code,
                    answers,
                    tls,
                } = response;
                record.tls = tls;
                record.response = Some(ResponseInfo {
                    server,
                    authoritative,
                    code,
                    answers,
                });
            }
            Err(problem) => {
                warn!("{}: {}", self.endpoint.url, problem);
                record.fail(&problem);
            }
        }

        record.duration_us = micros(tick.elapsed());
        record
    }
}
