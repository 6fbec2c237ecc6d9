//! Session orchestration
//!
//! Drives one status query end to end: SRV discovery with permissive
//! fallback, TCP connect, handshake + status request, status response,
//! ping, pong, then a graceful close. The whole run is bounded by a
//! single timeout; the connection is torn down on every exit path.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::discovery::{self, Endpoint};
use crate::protocol::{
    epoch_millis, handshake_sequence, ping_packet, CodecError, StatusEvent, StreamDecoder,
    DEFAULT_PORT, PROTOCOL_VERSION,
};

/// Overall query timeout, matching the upstream protocol default
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Session errors
#[derive(Error, Debug)]
pub enum PingError {
    #[error("not a minecraft address: {0}")]
    InvalidAddress(String),

    #[error("decode error: {0}")]
    Decode(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed before the status exchange completed")]
    ConnectionClosed,

    #[error("timed out after {0} ms")]
    Timeout(u64),
}

pub type PingResult<T> = Result<T, PingError>;

/// Per-query configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Overall bound on the query, from discovery to pong
    pub timeout_ms: u64,
    /// Protocol version sent in the handshake
    pub protocol_version: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Successful query result
#[derive(Debug, Clone)]
pub struct ServerStatus {
    /// Server metadata document, passed through unparsed beyond JSON
    pub metadata: Value,
    /// Measured round-trip latency in milliseconds
    pub latency_ms: i64,
}

/// Session progress between the two awaited replies
enum SessionState {
    AwaitStatus,
    AwaitPong { metadata: Value },
}

/// Query a server by host and port.
///
/// SRV discovery runs first; any discovery failure falls back to the
/// supplied host and port unchanged.
pub async fn ping(host: &str, port: u16, config: &SessionConfig) -> PingResult<ServerStatus> {
    let bound = Duration::from_millis(config.timeout_ms);
    match tokio::time::timeout(bound, run_session(host, port, config.protocol_version)).await {
        Ok(result) => result,
        Err(_) => Err(PingError::Timeout(config.timeout_ms)),
    }
}

/// Query a server by `minecraft://host[:port]` URI.
///
/// A wrong scheme or missing host fails with `InvalidAddress` before any
/// network activity.
pub async fn ping_uri(uri: &str, config: &SessionConfig) -> PingResult<ServerStatus> {
    let (host, port) = parse_uri(uri)?;
    ping(&host, port, config).await
}

async fn run_session(host: &str, port: u16, protocol_version: u64) -> PingResult<ServerStatus> {
    let endpoint = resolve_endpoint(host, port).await;
    connect_and_query(&endpoint, protocol_version).await
}

/// SRV discovery with the permissive fallback: any discovery failure
/// keeps the caller-supplied host and port unchanged.
async fn resolve_endpoint(host: &str, port: u16) -> Endpoint {
    match discovery::resolve_srv(host).await {
        Ok(endpoint) => endpoint,
        Err(e) => {
            tracing::debug!(host, %e, "SRV discovery skipped, using supplied endpoint");
            Endpoint::new(host, port)
        }
    }
}

/// Dial the (possibly SRV-resolved) endpoint and run the status exchange.
async fn connect_and_query(endpoint: &Endpoint, protocol_version: u64) -> PingResult<ServerStatus> {
    tracing::debug!(host = %endpoint.host, port = endpoint.port, "connecting");
    let mut stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;

    stream
        .write_all(&handshake_sequence(&endpoint.host, endpoint.port, protocol_version))
        .await?;
    stream.flush().await?;

    let mut decoder = StreamDecoder::new();
    let mut state = SessionState::AwaitStatus;
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(PingError::ConnectionClosed);
        }

        for event in decoder.feed(&chunk[..n])? {
            state = match (state, event) {
                (SessionState::AwaitStatus, StatusEvent::Status(metadata)) => {
                    stream.write_all(&ping_packet(epoch_millis())).await?;
                    stream.flush().await?;
                    SessionState::AwaitPong { metadata }
                }
                (SessionState::AwaitPong { metadata }, StatusEvent::Pong { latency_ms }) => {
                    stream.shutdown().await?;
                    return Ok(ServerStatus {
                        metadata,
                        latency_ms,
                    });
                }
                (state, event) => {
                    tracing::debug!(?event, "out-of-order packet ignored");
                    state
                }
            };
        }
    }
}

/// Split a `minecraft://host[:port]` URI into host and port.
fn parse_uri(uri: &str) -> PingResult<(String, u16)> {
    let invalid = || PingError::InvalidAddress(uri.to_string());

    let rest = uri.strip_prefix("minecraft://").ok_or_else(invalid)?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);

    let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
        // IPv6 literals carry colons, so the port separator follows ']'.
        let (host, after) = bracketed.split_once(']').ok_or_else(invalid)?;
        let port = match after.strip_prefix(':') {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None if after.is_empty() => DEFAULT_PORT,
            None => return Err(invalid()),
        };
        (host, port)
    } else if let Some((host, p)) = authority.rsplit_once(':') {
        (host, p.parse().map_err(|_| invalid())?)
    } else {
        (authority, DEFAULT_PORT)
    };

    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}
