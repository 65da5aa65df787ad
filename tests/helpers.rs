// Shared test helpers for integration tests.
//
// In-process DNS responders serving canned answers over UDP and framed
// TCP, so probe tests never depend on outside infrastructure, plus a
// builder that turns a responder address into a one-endpoint probe.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::{A, CNAME, TXT};
use hickory_proto::rr::{Name, RData, Record};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use rustls::ServerConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio_rustls::TlsAcceptor;

use dns_sentinel::initialization::init_crypto_provider;
use dns_sentinel::{Plugin, Registry};

/// Builds an A record with a five-minute TTL.
#[allow(dead_code)] // Used by other test files
pub fn a_record(name: &str, addr: [u8; 4]) -> Record {
    Record::from_rdata(
        Name::from_ascii(name).expect("record name"),
        300,
        RData::A(A(Ipv4Addr::from(addr))),
    )
}

/// Builds a CNAME record with a five-minute TTL.
#[allow(dead_code)] // Used by other test files
pub fn cname_record(name: &str, target: &str) -> Record {
    Record::from_rdata(
        Name::from_ascii(name).expect("record name"),
        300,
        RData::CNAME(CNAME(Name::from_ascii(target).expect("cname target"))),
    )
}

/// Builds a TXT record with a five-minute TTL.
#[allow(dead_code)] // Used by other test files
pub fn txt_record(name: &str, text: &str) -> Record {
    Record::from_rdata(
        Name::from_ascii(name).expect("record name"),
        300,
        RData::TXT(TXT::new(vec![text.to_string()])),
    )
}

/// Spawns a UDP responder that answers every query with the canned
/// records after `delay`. Returns the bound address.
#[allow(dead_code)] // Used by other test files
pub async fn spawn_udp_responder(
    records: Vec<Record>,
    authoritative: bool,
    delay: Duration,
) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind mock udp socket");
    let address = socket.local_addr().expect("mock udp address");
    tokio::spawn(async move {
        let mut buffer = vec![0u8; 4096];
        loop {
            let Ok((received, peer)) = socket.recv_from(&mut buffer).await else {
                break;
            };
            let Ok(query) = Message::from_bytes(&buffer[..received]) else {
                continue;
            };
            tokio::time::sleep(delay).await;
            let response = build_response(&query, &records, authoritative);
            let Ok(bytes) = response.to_bytes() else {
                continue;
            };
            let _ = socket.send_to(&bytes, peer).await;
        }
    });
    address
}

/// Spawns a framed-TCP responder: accepts connections, reads one
/// length-prefixed query each, replies with the canned records.
#[allow(dead_code)] // Used by other test files
pub async fn spawn_tcp_responder(records: Vec<Record>, authoritative: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock tcp listener");
    let address = listener.local_addr().expect("mock tcp address");
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let records = records.clone();
            tokio::spawn(async move {
                let mut length_prefix = [0u8; 2];
                if stream.read_exact(&mut length_prefix).await.is_err() {
                    return;
                }
                let length = u16::from_be_bytes(length_prefix) as usize;
                let mut payload = vec![0u8; length];
                if stream.read_exact(&mut payload).await.is_err() {
                    return;
                }
                let Ok(query) = Message::from_bytes(&payload) else {
                    return;
                };
                let response = build_response(&query, &records, authoritative);
                let Ok(bytes) = response.to_bytes() else {
                    return;
                };
                let mut framed = Vec::with_capacity(bytes.len() + 2);
                framed.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
                framed.extend_from_slice(&bytes);
                let _ = stream.write_all(&framed).await;
            });
        }
    });
    address
}

/// Issues a throwaway CA plus a leaf certificate for `127.0.0.1` signed
/// by it. Returns the CA PEM to trust and the leaf PEM + key PEM the
/// responder presents.
#[allow(dead_code)] // Used by other test files
pub fn issue_ca_and_leaf() -> (String, String, String) {
    let mut ca_params = rcgen::CertificateParams::new(Vec::<String>::new());
    ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    ca_params
        .distinguished_name
        .push(rcgen::DnType::CommonName, "dns_sentinel test ca");
    let ca = rcgen::Certificate::from_params(ca_params).expect("generate ca");

    let leaf_params = rcgen::CertificateParams::new(vec!["127.0.0.1".to_string()]);
    let leaf = rcgen::Certificate::from_params(leaf_params).expect("generate leaf");

    let ca_pem = ca.serialize_pem().expect("ca pem");
    let leaf_pem = leaf.serialize_pem_with_signer(&ca).expect("leaf pem");
    let key_pem = leaf.serialize_private_key_pem();
    (ca_pem, leaf_pem, key_pem)
}

/// Spawns a DNS-over-TLS responder presenting `leaf_pem`/`key_pem`:
/// completes the handshake, then answers one framed query per
/// connection.
#[allow(dead_code)] // Used by other test files
pub async fn spawn_tls_responder(
    records: Vec<Record>,
    authoritative: bool,
    leaf_pem: &str,
    key_pem: &str,
) -> SocketAddr {
    init_crypto_provider();

    let certs: Vec<_> = rustls_pemfile::certs(&mut leaf_pem.as_bytes())
        .collect::<Result<_, _>>()
        .expect("certificate chain");
    let key = rustls_pemfile::private_key(&mut key_pem.as_bytes())
        .expect("read private key")
        .expect("private key present");
    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .expect("acceptor config");
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock tls listener");
    let address = listener.local_addr().expect("mock tls address");
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let acceptor = acceptor.clone();
            let records = records.clone();
            tokio::spawn(async move {
                let Ok(mut stream) = acceptor.accept(stream).await else {
                    return;
                };
                let mut length_prefix = [0u8; 2];
                if stream.read_exact(&mut length_prefix).await.is_err() {
                    return;
                }
                let length = u16::from_be_bytes(length_prefix) as usize;
                let mut payload = vec![0u8; length];
                if stream.read_exact(&mut payload).await.is_err() {
                    return;
                }
                let Ok(query) = Message::from_bytes(&payload) else {
                    return;
                };
                let response = build_response(&query, &records, authoritative);
                let Ok(bytes) = response.to_bytes() else {
                    return;
                };
                let mut framed = Vec::with_capacity(bytes.len() + 2);
                framed.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
                framed.extend_from_slice(&bytes);
                let _ = stream.write_all(&framed).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    address
}

/// Spawns a TCP listener that accepts and immediately hangs up, so no
/// handshake attempted over it can complete.
#[allow(dead_code)] // Used by other test files
pub async fn spawn_hangup_tcp() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind hangup listener");
    let address = listener.local_addr().expect("hangup address");
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            drop(stream);
        }
    });
    address
}

/// Spawns a UDP responder whose replies carry the truncation flag.
#[allow(dead_code)] // Used by other test files
pub async fn spawn_truncating_udp() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind truncating udp socket");
    let address = socket.local_addr().expect("truncating udp address");
    tokio::spawn(async move {
        let mut buffer = vec![0u8; 4096];
        loop {
            let Ok((received, peer)) = socket.recv_from(&mut buffer).await else {
                break;
            };
            let Ok(query) = Message::from_bytes(&buffer[..received]) else {
                continue;
            };
            let mut response = build_response(&query, &[], false);
            response.set_truncated(true);
            let Ok(bytes) = response.to_bytes() else {
                continue;
            };
            let _ = socket.send_to(&bytes, peer).await;
        }
    });
    address
}

/// Spawns a UDP responder whose replies come back under a different
/// message id than the query carried.
#[allow(dead_code)] // Used by other test files
pub async fn spawn_wrong_id_udp() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind wrong-id udp socket");
    let address = socket.local_addr().expect("wrong-id udp address");
    tokio::spawn(async move {
        let mut buffer = vec![0u8; 4096];
        loop {
            let Ok((received, peer)) = socket.recv_from(&mut buffer).await else {
                break;
            };
            let Ok(query) = Message::from_bytes(&buffer[..received]) else {
                continue;
            };
            let mut response = build_response(&query, &[], false);
            response.set_id(query.id().wrapping_add(1));
            let Ok(bytes) = response.to_bytes() else {
                continue;
            };
            let _ = socket.send_to(&bytes, peer).await;
        }
    });
    address
}

/// Spawns a UDP endpoint that swallows every query without answering.
#[allow(dead_code)] // Used by other test files
pub async fn spawn_silent_udp() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind silent udp socket");
    let address = socket.local_addr().expect("silent udp address");
    tokio::spawn(async move {
        let mut buffer = vec![0u8; 4096];
        loop {
            if socket.recv_from(&mut buffer).await.is_err() {
                break;
            }
        }
    });
    address
}

/// Builds a one-endpoint DNS probe aimed at `address`.
///
/// `check_yaml` is appended verbatim to the settings block; pass "" for
/// no expectations, or a `check:` block with two-space indentation.
#[allow(dead_code)] // Used by other test files
pub fn probe_for(address: SocketAddr, scheme: &str, timeout_secs: u64, check_yaml: &str) -> Plugin {
    let yaml = format!(
        "dns_servers:\n  - \"{scheme}://{ip}:{port}\"\ntarget: \"probe.example.com\"\ntimeout: {timeout_secs}\n{check_yaml}",
        ip = address.ip(),
        port = address.port(),
    );
    let settings: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("probe yaml");
    Registry::with_defaults()
        .create("dns", "test-probe", &settings)
        .expect("build probe")
}

/// Echoes the query back as a response carrying the canned records.
fn build_response(query: &Message, records: &[Record], authoritative: bool) -> Message {
    let mut response = Message::new();
    response
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(query.recursion_desired())
        .set_recursion_available(true)
        .set_authoritative(authoritative)
        .set_response_code(ResponseCode::NoError);
    for question in query.queries() {
        response.add_query(question.clone());
    }
    for record in records {
        response.add_answer(record.clone());
    }
    response
}
