use std::io;
use std::net::SocketAddr;

use tracing::debug;

use crate::error::EmitError;

/// Resolve `host:port` to a single destination.
///
/// Prefers IPv4 but falls back to IPv6 if no IPv4 address is available.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, EmitError> {
    let addr = format!("{}:{}", host, port);
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr)
        .await
        .map_err(|source| EmitError::Resolve {
            addr: addr.clone(),
            source,
        })?
        .collect();

    let chosen = addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| EmitError::Resolve {
            addr: addr.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
        })?;

    debug!(target: "net", "Resolved {} to {}", addr, chosen);
    Ok(chosen)
}

/// Local bind address in the same family as `target`
pub fn bind_addr_for(target: &SocketAddr) -> &'static str {
    if target.is_ipv4() {
        "0.0.0.0:0"
    } else {
        "[::]:0"
    }
}
