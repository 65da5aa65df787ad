//! Result records.
//!
//! One record per job invocation, shaped for line-oriented JSON output.
//! Figures that were never measured are omitted entirely so a reader can
//! tell "not measured" from zero.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::dns::answer::DnsAnswer;
use crate::error::{ErrorKind, FailureClass, ProbeError};
use crate::timing::{micros, RttSample};
use crate::tls::TlsSession;

/// Probe verdict for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The endpoint answered and every expectation held.
    Up,
    /// The exchange failed or an expectation did not hold.
    Down,
}

/// Classified failure attached to a down record.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Stable failure tag.
    pub kind: ErrorKind,
    /// Connectivity or validation.
    pub class: FailureClass,
    /// Human-readable message.
    pub message: String,
}

/// How the endpoint host was turned into an address.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveInfo {
    /// Address the exchange dialed.
    pub ip: String,
    /// Lookup time in microseconds; absent for IP-literal hosts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtt_us: Option<u64>,
}

/// Decoded response fields, present when the exchange succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseInfo {
    /// Canonical URL of the endpoint that answered.
    pub server: String,
    /// Whether the authoritative-answer flag was set.
    pub authoritative: bool,
    /// Response code (`NoError`, `NXDomain`, ...).
    pub code: String,
    /// Projected answer records.
    pub answers: Vec<DnsAnswer>,
}

/// Round-trip figures in microseconds.
///
/// Only milestones the exchange actually reached appear.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RttInfo {
    /// Full exchange duration.
    pub total_us: u64,
    /// Time spent writing the query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_request_us: Option<u64>,
    /// Write start until the first response bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_header_us: Option<u64>,
    /// Write start until the exchange finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate_us: Option<u64>,
    /// First response bytes until the exchange finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_us: Option<u64>,
}

impl From<RttSample> for RttInfo {
    fn from(sample: RttSample) -> Self {
        RttInfo {
            total_us: micros(sample.total),
            write_request_us: sample.write_request.map(micros),
            response_header_us: sample.response_header.map(micros),
            validate_us: sample.validate.map(micros),
            content_us: sample.content.map(micros),
        }
    }
}

/// Everything one job invocation reports.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    /// Wall-clock time the tick started.
    #[serde(serialize_with = "rfc3339_millis")]
    pub timestamp: DateTime<Utc>,
    /// Probe instance name.
    pub probe: String,
    /// Canonical endpoint URL this record is about.
    pub url: String,
    /// Verdict.
    pub status: Status,
    /// Whole tick duration in microseconds, failures included.
    pub duration_us: u64,
    /// Classified failure, present on down records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// Host resolution details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve: Option<ResolveInfo>,
    /// Decoded response, present when the exchange succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseInfo>,
    /// Round-trip figures, present when the exchange succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtt: Option<RttInfo>,
    /// Negotiated TLS session, present on encrypted exchanges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsSession>,
}

impl ResultRecord {
    /// Starts an up record with nothing measured yet.
    pub fn new(probe: String, url: String) -> Self {
        ResultRecord {
            timestamp: Utc::now(),
            probe,
            url,
            status: Status::Up,
            duration_us: 0,
            error: None,
            resolve: None,
            response: None,
            rtt: None,
            tls: None,
        }
    }

    /// Marks the record down with a classified failure.
    pub fn fail(&mut self, problem: &ProbeError) {
        self.status = Status::Down;
        self.error = Some(ErrorInfo {
            kind: problem.kind(),
            class: problem.class(),
            message: problem.to_string(),
        });
    }
}

fn rfc3339_millis<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}
