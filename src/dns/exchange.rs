//! Query/response exchange over one transport.
//!
//! One exchange sends a single query and reads a single response. The
//! whole thing, dialing included, runs under one deadline; timing
//! milestones travel back with the result instead of living in shared
//! state.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

use crate::config::MAX_UDP_PAYLOAD;
use crate::dns::answer::{project_answers, DnsAnswer};
use crate::dns::endpoint::{DnsEndpoint, Scheme};
use crate::error::ProbeError;
use crate::timing::TimingTrace;
use crate::tls::{TlsMaterial, TlsSession};

/// Everything a successful exchange produced.
#[derive(Debug, Clone)]
pub struct ExchangeResult {
    /// Canonical URL of the endpoint that answered.
    pub server: String,
    /// Whether the response carried the authoritative-answer flag.
    pub authoritative: bool,
    /// Response code as text (`NoError`, `NXDomain`, ...).
    pub code: String,
    /// Projected answer records.
    pub answers: Vec<DnsAnswer>,
    /// Negotiated TLS session, when the encrypted transport was used.
    pub tls: Option<TlsSession>,
}

/// Outcome of one exchange: the timing trace always, the decoded response
/// when the exchange got that far.
#[derive(Debug)]
pub struct ExchangeOutcome {
    /// Milestones captured while the exchange ran.
    pub trace: TimingTrace,
    /// Decoded response or the classified failure.
    pub result: Result<ExchangeResult, ProbeError>,
}

/// Wire milestones, only produced when a response actually came back.
struct WireTiming {
    write_start: Instant,
    write_end: Instant,
    read_start: Instant,
}

/// Runs one query/response exchange against `endpoint` at `address`.
///
/// All failure modes come back inside the outcome. The trace is returned
/// either way, with wire milestones populated only when the exchange
/// reached them; a timed-out or undialable exchange reports none.
pub async fn exchange(
    endpoint: &DnsEndpoint,
    ip: IpAddr,
    target: &Name,
    timeout: Duration,
    tls: Option<&TlsMaterial>,
) -> ExchangeOutcome {
    let start = Instant::now();
    let bounded = tokio::time::timeout(timeout, exchange_inner(endpoint, ip, target, tls)).await;
    let end = Instant::now();

    let (result, wire) = match bounded {
        Ok(Ok((result, wire))) => (Ok(result), Some(wire)),
        Ok(Err(problem)) => (Err(problem), None),
        Err(_) => (
            Err(ProbeError::Timeout {
                host: endpoint.host.clone(),
                port: endpoint.port,
                timeout,
            }),
            None,
        ),
    };

    ExchangeOutcome {
        trace: TimingTrace {
            start,
            end,
            write_start: wire.as_ref().map(|wire| wire.write_start),
            write_end: wire.as_ref().map(|wire| wire.write_end),
            read_start: wire.as_ref().map(|wire| wire.read_start),
        },
        result,
    }
}

async fn exchange_inner(
    endpoint: &DnsEndpoint,
    ip: IpAddr,
    target: &Name,
    tls: Option<&TlsMaterial>,
) -> Result<(ExchangeResult, WireTiming), ProbeError> {
    let query = build_query(target);
    let payload = query.to_bytes().map_err(|source| ProbeError::Decode {
        host: endpoint.host.clone(),
        port: endpoint.port,
        source,
    })?;
    let address = SocketAddr::new(ip, endpoint.port);

    let mut session = None;
    let (response, wire) = match (endpoint.scheme, tls) {
        (Scheme::Tcp, Some(material)) => {
            let stream = connect_tcp(endpoint, address).await?;
            let mut stream = material
                .handshake(&endpoint.host, endpoint.port, stream)
                .await?;
            session = Some(TlsSession::of(&stream));
            exchange_framed(endpoint, &mut stream, &payload).await?
        }
        (Scheme::Tcp, None) => {
            let mut stream = connect_tcp(endpoint, address).await?;
            exchange_framed(endpoint, &mut stream, &payload).await?
        }
        (Scheme::Udp, _) => exchange_datagram(endpoint, address, &payload).await?,
    };

    let message = Message::from_bytes(&response).map_err(|source| ProbeError::Decode {
        host: endpoint.host.clone(),
        port: endpoint.port,
        source,
    })?;
    if message.id() != query.id() {
        return Err(ProbeError::IdMismatch {
            sent: query.id(),
            got: message.id(),
        });
    }
    if endpoint.scheme == Scheme::Udp && message.truncated() {
        return Err(ProbeError::Truncated {
            host: endpoint.host.clone(),
            port: endpoint.port,
        });
    }

    debug!(
        "{} answered {:?} with {} record(s)",
        endpoint.url,
        message.response_code(),
        message.answers().len()
    );

    Ok((
        ExchangeResult {
            server: endpoint.url.clone(),
            authoritative: message.authoritative(),
            code: format!("{:?}", message.response_code()),
            answers: project_answers(&message),
            tls: session,
        },
        wire,
    ))
}

/// Builds the query: one `ANY` question for `target`, recursion desired,
/// random id.
fn build_query(target: &Name) -> Message {
    let mut message = Message::new();
    message
        .set_id(rand::random::<u16>())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(target.clone(), RecordType::ANY));
    message
}

async fn connect_tcp(endpoint: &DnsEndpoint, address: SocketAddr) -> Result<TcpStream, ProbeError> {
    TcpStream::connect(address)
        .await
        .map_err(|source| ProbeError::Connect {
            host: endpoint.host.clone(),
            port: endpoint.port,
            source,
        })
}

/// Sends the query as one datagram and waits for one datagram back.
async fn exchange_datagram(
    endpoint: &DnsEndpoint,
    address: SocketAddr,
    payload: &[u8],
) -> Result<(Vec<u8>, WireTiming), ProbeError> {
    let connect_error = |source| ProbeError::Connect {
        host: endpoint.host.clone(),
        port: endpoint.port,
        source,
    };
    let io_error = |source| ProbeError::Io {
        host: endpoint.host.clone(),
        port: endpoint.port,
        source,
    };

    let bind = if address.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(bind).await.map_err(connect_error)?;
    socket.connect(address).await.map_err(connect_error)?;

    let write_start = Instant::now();
    socket.send(payload).await.map_err(io_error)?;
    let write_end = Instant::now();

    let mut buffer = vec![0u8; MAX_UDP_PAYLOAD];
    let received = socket.recv(&mut buffer).await.map_err(io_error)?;
    let read_start = Instant::now();
    buffer.truncate(received);

    Ok((
        buffer,
        WireTiming {
            write_start,
            write_end,
            read_start,
        },
    ))
}

/// Sends the query with the 2-byte big-endian length prefix the reliable
/// transport uses, and reads one length-prefixed response back.
async fn exchange_framed<S>(
    endpoint: &DnsEndpoint,
    stream: &mut S,
    payload: &[u8],
) -> Result<(Vec<u8>, WireTiming), ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let io_error = |source| ProbeError::Io {
        host: endpoint.host.clone(),
        port: endpoint.port,
        source,
    };

    let mut framed = Vec::with_capacity(payload.len() + 2);
    framed.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    framed.extend_from_slice(payload);

    let write_start = Instant::now();
    stream.write_all(&framed).await.map_err(io_error)?;
    stream.flush().await.map_err(io_error)?;
    let write_end = Instant::now();

    let mut length_prefix = [0u8; 2];
    stream.read_exact(&mut length_prefix).await.map_err(io_error)?;
    let read_start = Instant::now();
    let length = u16::from_be_bytes(length_prefix) as usize;
    let mut response = vec![0u8; length];
    stream.read_exact(&mut response).await.map_err(io_error)?;

    Ok((
        response,
        WireTiming {
            write_start,
            write_end,
            read_start,
        },
    ))
}
