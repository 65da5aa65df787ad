//! Endpoint descriptors.
//!
//! A probe endpoint is written as `[scheme://]host[:port]`. The scheme
//! picks the transport: `udp` for plain datagrams, `tcp` for the reliable
//! transport, which is also the one TLS can wrap. Missing pieces get
//! defaults.

use std::fmt;

use url::Url;

use crate::config::DEFAULT_DNS_PORT;
use crate::error::ConfigError;

/// Transport scheme for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Connectionless datagram transport.
    Udp,
    /// Connection-oriented transport.
    Tcp,
}

impl Scheme {
    /// Scheme tag as written in an endpoint URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Udp => "udp",
            Scheme::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One probe endpoint: where a query is sent and over which transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsEndpoint {
    /// Transport scheme.
    pub scheme: Scheme,
    /// Host name or IP literal, lower-cased, without IPv6 brackets.
    pub host: String,
    /// Port the endpoint listens on.
    pub port: u16,
    /// Canonical form of the descriptor. Feeding it back to `parse` yields
    /// the same endpoint; every result record echoes it.
    pub url: String,
}

impl DnsEndpoint {
    /// Parses an endpoint descriptor.
    ///
    /// The descriptor is lower-cased first. A missing scheme defaults to
    /// `udp://`, a missing port to 53. Schemes other than `udp` and `tcp`
    /// are rejected, as are port 0 and descriptors without a host.
    pub fn parse(descriptor: &str) -> Result<Self, ConfigError> {
        let original = descriptor.trim();
        let mut address = original.to_ascii_lowercase();

        let parsed = match Url::parse(&address) {
            Ok(parsed) if parsed.host_str().is_some_and(|host| !host.is_empty()) => parsed,
            Err(url::ParseError::InvalidPort) => {
                return Err(ConfigError::InvalidPort(original.to_string()));
            }
            other => {
                if address.starts_with("udp://") || address.starts_with("tcp://") {
                    return Err(match other {
                        Err(source) => ConfigError::InvalidEndpoint {
                            endpoint: original.to_string(),
                            source,
                        },
                        Ok(_) => ConfigError::MissingHost,
                    });
                }
                // A bare `host` or `host:port` parses as scheme-only or not
                // at all; retry with the default scheme in front.
                address = format!("udp://{address}");
                match Url::parse(&address) {
                    Ok(parsed) => parsed,
                    Err(url::ParseError::InvalidPort) => {
                        return Err(ConfigError::InvalidPort(original.to_string()));
                    }
                    Err(source) => {
                        return Err(ConfigError::InvalidEndpoint {
                            endpoint: original.to_string(),
                            source,
                        });
                    }
                }
            }
        };

        let scheme = match parsed.scheme() {
            "udp" => Scheme::Udp,
            "tcp" => Scheme::Tcp,
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };

        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => strip_brackets(host).to_string(),
            _ => return Err(ConfigError::MissingHost),
        };

        let port = match parsed.port() {
            Some(0) => return Err(ConfigError::InvalidPort(original.to_string())),
            Some(port) => port,
            None => DEFAULT_DNS_PORT,
        };

        Ok(DnsEndpoint {
            scheme,
            host,
            port,
            url: address,
        })
    }
}

impl fmt::Display for DnsEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// IPv6 hosts come back from the URL parser in bracketed form.
fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(host)
}
