//! Encrypted-transport material.
//!
//! The connector is built once per probe from the `ssl` settings block and
//! shared read-only by every job. The handshake itself happens per
//! exchange, against an already-dialed stream.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::error::{ConfigError, ProbeError};

/// TLS settings block for a probe.
///
/// Presence of the block switches every endpoint of the probe to the
/// encrypted transport.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsSettings {
    /// Extra PEM bundle trusted in addition to the built-in roots.
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
}

/// Pre-built client-side TLS configuration, shared across jobs.
///
/// The process-level crypto provider must be installed before `load` is
/// called; see `initialization::init_crypto_provider`.
#[derive(Clone)]
pub struct TlsMaterial {
    connector: TlsConnector,
}

impl TlsMaterial {
    /// Builds the connector once: webpki roots, plus the extra bundle when
    /// one is configured.
    pub fn load(settings: &TlsSettings) -> Result<Self, ConfigError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        if let Some(path) = &settings.ca_file {
            let file = File::open(path).map_err(|source| ConfigError::CaFile {
                path: path.display().to_string(),
                source,
            })?;
            let mut reader = BufReader::new(file);
            let mut added = 0usize;
            for certificate in rustls_pemfile::certs(&mut reader) {
                let certificate = certificate.map_err(|source| ConfigError::CaFile {
                    path: path.display().to_string(),
                    source,
                })?;
                let (accepted, _) = roots.add_parsable_certificates([certificate]);
                added += accepted;
            }
            if added == 0 {
                return Err(ConfigError::EmptyCaFile(path.display().to_string()));
            }
        }

        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(TlsMaterial {
            connector: TlsConnector::from(Arc::new(config)),
        })
    }

    /// Runs the TLS handshake for `host` over an established stream.
    pub async fn handshake(
        &self,
        host: &str,
        port: u16,
        stream: TcpStream,
    ) -> Result<TlsStream<TcpStream>, ProbeError> {
        let server_name =
            ServerName::try_from(host.to_string()).map_err(|source| ProbeError::ServerName {
                host: host.to_string(),
                source,
            })?;
        self.connector
            .connect(server_name, stream)
            .await
            .map_err(|source| ProbeError::TlsHandshake {
                host: host.to_string(),
                port,
                source,
            })
    }
}

/// Negotiated TLS session details, captured after the handshake.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TlsSession {
    /// Negotiated protocol version, `Unknown` if not yet agreed.
    pub version: String,
    /// Negotiated cipher suite, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher_suite: Option<String>,
}

impl TlsSession {
    /// Reads the negotiated parameters off an established stream.
    pub fn of(stream: &TlsStream<TcpStream>) -> Self {
        let (_, connection) = stream.get_ref();
        TlsSession {
            version: connection
                .protocol_version()
                .map(|version| format!("{version:?}"))
                .unwrap_or_else(|| "Unknown".to_string()),
            cipher_suite: connection
                .negotiated_cipher_suite()
                .map(|suite| format!("{:?}", suite.suite())),
        }
    }
}
