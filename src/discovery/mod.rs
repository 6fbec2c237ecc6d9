//! Service discovery module
//!
//! Resolves the DNS SRV record Minecraft servers publish under
//! `_minecraft._tcp.<hostname>` to find the authoritative host and port.
//! Best-effort: every failure here is recovered by the session falling
//! back to the caller-supplied host and port.

use std::net::IpAddr;

use hickory_resolver::proto::rr::rdata::SRV;
use hickory_resolver::TokioAsyncResolver;
use thiserror::Error;

/// SRV service label prefixed to the queried hostname
pub const SERVICE_PREFIX: &str = "_minecraft._tcp";

/// Discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("hostname is a literal IP address")]
    NotApplicable,

    #[error("SRV resolution failed: {0}")]
    ResolutionFailed(String),
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// A connectable host/port pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Resolve the SRV record for `hostname`.
///
/// Literal IPv4/IPv6 addresses carry no SRV records, so they fail fast
/// with `NotApplicable`. A lookup error or an empty answer is
/// `ResolutionFailed`; callers treat both failures the same way.
pub async fn resolve_srv(hostname: &str) -> DiscoveryResult<Endpoint> {
    if hostname.parse::<IpAddr>().is_ok() {
        return Err(DiscoveryError::NotApplicable);
    }

    let resolver = TokioAsyncResolver::tokio_from_system_conf()
        .map_err(|e| DiscoveryError::ResolutionFailed(e.to_string()))?;

    let name = format!("{}.{}", SERVICE_PREFIX, hostname);
    let lookup = resolver
        .srv_lookup(name.as_str())
        .await
        .map_err(|e| DiscoveryError::ResolutionFailed(e.to_string()))?;

    let record = lookup
        .iter()
        .next()
        .ok_or_else(|| DiscoveryError::ResolutionFailed(format!("no SRV records for {name}")))?;

    let endpoint = srv_endpoint(record);
    tracing::debug!(host = %endpoint.host, port = endpoint.port, "SRV record resolved");

    Ok(endpoint)
}

/// Map an SRV record to a connectable endpoint, dropping the trailing
/// root dot DNS names carry.
fn srv_endpoint(record: &SRV) -> Endpoint {
    let target = record.target().to_utf8();
    Endpoint::new(target.trim_end_matches('.'), record.port())
}
