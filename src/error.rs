//! Error types for configuration, probing, and process setup.

use std::fmt;
use std::io;
use std::time::Duration;

use hickory_proto::error::ProtoError;
use hickory_resolver::error::ResolveError;
use log::SetLoggerError;
use serde::Serialize;
use strum_macros::EnumIter;
use thiserror::Error;

/// Errors raised while setting up process-level resources.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// The global logger was already installed or refused the config.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// A single problem found in a probe configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings block does not deserialize into the probe's config.
    #[error("probe configuration is invalid: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// Endpoint descriptor carried a scheme other than `udp` or `tcp`.
    #[error("invalid protocol specified {0}")]
    UnsupportedScheme(String),
    /// Endpoint descriptor had no host part.
    #[error("dns server address is mandatory")]
    MissingHost,
    /// Endpoint descriptor port was missing digits, out of range, or zero.
    #[error("invalid port in {0}")]
    InvalidPort(String),
    /// Endpoint descriptor did not parse as a URL at all.
    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        /// Descriptor as written in the config.
        endpoint: String,
        /// Underlying URL parse failure.
        #[source]
        source: url::ParseError,
    },
    /// Endpoint host is neither an IP literal nor a well-formed host name.
    #[error("invalid DNS server: {0}")]
    InvalidServer(String),
    /// The same endpoint descriptor appeared more than once.
    #[error("duplicates detected [{0}]")]
    Duplicates(String),
    /// The endpoint list was empty.
    #[error("at least one dns server is required")]
    NoServers,
    /// The exchange deadline was zero.
    #[error("timeout must be greater than zero")]
    InvalidTimeout,
    /// The expected record type is not one the probe can assert on.
    #[error("unknown record type for `record_type`: '{0}', please use one of 'a', 'aaaa', 'cname', 'txt'")]
    UnknownRecordType(String),
    /// The query target was missing.
    #[error("target is mandatory")]
    MissingTarget,
    /// The query target is not a well-formed DNS name.
    #[error("invalid target {target}: {source}")]
    InvalidTarget {
        /// Target as written in the config.
        target: String,
        /// Underlying name parse failure.
        #[source]
        source: ProtoError,
    },
    /// TLS was configured for an endpoint that speaks plain datagrams.
    #[error("ssl requires tcp:// endpoints, got {0}")]
    TlsOverUdp(String),
    /// The extra CA bundle could not be read.
    #[error("failed to read ca file {path}: {source}")]
    CaFile {
        /// Path as written in the config.
        path: String,
        /// Underlying read failure.
        #[source]
        source: io::Error,
    },
    /// The extra CA bundle contained no usable certificates.
    #[error("no certificates found in ca file {0}")]
    EmptyCaFile(String),
    /// The probes file named a probe type the registry does not know.
    #[error("unknown probe type: {0}")]
    UnknownProbeType(String),
}

/// Every problem found in a probe configuration, collected in one pass.
///
/// Validation keeps going after the first problem so a probe entry with
/// several mistakes reports all of them at once.
#[derive(Debug, Default)]
pub struct ConfigErrors(Vec<ConfigError>);

impl ConfigErrors {
    /// An empty collection.
    pub fn new() -> Self {
        ConfigErrors(Vec::new())
    }

    /// Records one more problem.
    pub fn push(&mut self, problem: ConfigError) {
        self.0.push(problem);
    }

    /// Whether any problem was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded problems.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The recorded problems, in the order they were found.
    pub fn problems(&self) -> &[ConfigError] {
        &self.0
    }

    /// Turns the collection into a `Result`: `Ok` when nothing was
    /// recorded, the collection itself otherwise.
    pub fn into_result(self) -> Result<(), ConfigErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            return write!(f, "{}", self.0[0]);
        }
        write!(f, "{} configuration problems: ", self.0.len())?;
        for (index, problem) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{problem}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}

impl From<ConfigError> for ConfigErrors {
    fn from(problem: ConfigError) -> Self {
        ConfigErrors(vec![problem])
    }
}

/// A response that decoded fine but does not meet an expectation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MismatchError {
    /// An answer's value differs from the expected value.
    #[error("record value of '{actual}' does not match expected value '{expected}'")]
    Value {
        /// Value the answer carried.
        actual: String,
        /// Value the config expects.
        expected: String,
    },
    /// An answer's type differs from the expected type.
    #[error("record type of '{actual}' does not match expected type '{expected}'")]
    Type {
        /// Type tag the answer carried.
        actual: String,
        /// Type tag the config expects.
        expected: String,
    },
    /// The response header lacked the authoritative-answer flag.
    #[error("response was not authoritative")]
    NotAuthoritative,
}

/// Anything that can go wrong while one job runs its exchange.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Dialing the endpoint failed.
    #[error("could not connect to {host}:{port}: {source}")]
    Connect {
        /// Endpoint host.
        host: String,
        /// Endpoint port.
        port: u16,
        /// Underlying socket failure.
        #[source]
        source: io::Error,
    },
    /// Reading or writing on an established transport failed.
    #[error("request to {host}:{port} failed: {source}")]
    Io {
        /// Endpoint host.
        host: String,
        /// Endpoint port.
        port: u16,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The whole exchange exceeded its deadline.
    #[error("request to {host}:{port} timed out after {timeout:?}")]
    Timeout {
        /// Endpoint host.
        host: String,
        /// Endpoint port.
        port: u16,
        /// Deadline that was exceeded.
        timeout: Duration,
    },
    /// The TLS handshake failed.
    #[error("tls handshake with {host}:{port} failed: {source}")]
    TlsHandshake {
        /// Endpoint host.
        host: String,
        /// Endpoint port.
        port: u16,
        /// Underlying handshake failure.
        #[source]
        source: io::Error,
    },
    /// The endpoint host is not usable as a TLS server name.
    #[error("invalid tls server name {host}: {source}")]
    ServerName {
        /// Endpoint host.
        host: String,
        /// Underlying name rejection.
        #[source]
        source: rustls::pki_types::InvalidDnsNameError,
    },
    /// The endpoint host name did not resolve.
    #[error("could not resolve {host}: {source}")]
    Resolve {
        /// Endpoint host.
        host: String,
        /// Underlying lookup failure.
        #[source]
        source: ResolveError,
    },
    /// The endpoint host name resolved to an empty address set.
    #[error("no addresses found for {host}")]
    NoAddresses {
        /// Endpoint host.
        host: String,
    },
    /// The response bytes did not decode as a DNS message.
    #[error("could not decode response from {host}:{port}: {source}")]
    Decode {
        /// Endpoint host.
        host: String,
        /// Endpoint port.
        port: u16,
        /// Underlying codec failure.
        #[source]
        source: ProtoError,
    },
    /// The response id does not match the query id.
    #[error("response id {got} does not match query id {sent}")]
    IdMismatch {
        /// Id the query was sent with.
        sent: u16,
        /// Id the response came back with.
        got: u16,
    },
    /// The response carried the truncation flag on the datagram transport.
    #[error("response from {host}:{port} was truncated")]
    Truncated {
        /// Endpoint host.
        host: String,
        /// Endpoint port.
        port: u16,
    },
    /// The response decoded fine but failed an expectation.
    #[error(transparent)]
    Mismatch(#[from] MismatchError),
}

/// Stable tag for each probe failure mode, used for counters and records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Dialing failed.
    Connect,
    /// Reading or writing failed after the dial.
    Io,
    /// The exchange deadline was exceeded.
    Timeout,
    /// The TLS handshake failed or the server name was unusable.
    TlsHandshake,
    /// The endpoint host did not resolve to an address.
    Resolve,
    /// The response did not decode, or decoded inconsistently.
    Decode,
    /// An answer value did not match the expectation.
    ValueMismatch,
    /// An answer type did not match the expectation.
    TypeMismatch,
    /// The authoritative-answer flag was expected and missing.
    NotAuthoritative,
}

impl ErrorKind {
    /// Human-readable label for summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connect => "connect error",
            ErrorKind::Io => "i/o error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::TlsHandshake => "tls handshake error",
            ErrorKind::Resolve => "resolve error",
            ErrorKind::Decode => "decode error",
            ErrorKind::ValueMismatch => "value mismatch",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::NotAuthoritative => "non-authoritative response",
        }
    }

    /// Which side of the up/down boundary the failure sits on.
    pub fn class(&self) -> FailureClass {
        match self {
            ErrorKind::ValueMismatch | ErrorKind::TypeMismatch | ErrorKind::NotAuthoritative => {
                FailureClass::Validation
            }
            _ => FailureClass::Connectivity,
        }
    }
}

/// Coarse failure classification reported on every down record.
///
/// Connectivity failures mean the endpoint never produced a usable
/// response; validation failures mean it did, and the answer was wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// No usable response reached the validator.
    Connectivity,
    /// A decoded response failed an expectation.
    Validation,
}

impl ProbeError {
    /// Stable tag for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Connect { .. } => ErrorKind::Connect,
            ProbeError::Io { .. } => ErrorKind::Io,
            ProbeError::Timeout { .. } => ErrorKind::Timeout,
            ProbeError::TlsHandshake { .. } | ProbeError::ServerName { .. } => {
                ErrorKind::TlsHandshake
            }
            ProbeError::Resolve { .. } | ProbeError::NoAddresses { .. } => ErrorKind::Resolve,
            ProbeError::Decode { .. } | ProbeError::IdMismatch { .. } | ProbeError::Truncated { .. } => {
                ErrorKind::Decode
            }
            ProbeError::Mismatch(MismatchError::Value { .. }) => ErrorKind::ValueMismatch,
            ProbeError::Mismatch(MismatchError::Type { .. }) => ErrorKind::TypeMismatch,
            ProbeError::Mismatch(MismatchError::NotAuthoritative) => ErrorKind::NotAuthoritative,
        }
    }

    /// Connectivity or validation, derived from the kind.
    pub fn class(&self) -> FailureClass {
        self.kind().class()
    }
}
