//! Endpoint resolution.
//!
//! Turns a host + service name pair into the ordered endpoint list a session
//! connects through. Resolution is kept separate from connecting so the
//! session only ever deals with already-resolved addresses.

use std::net::SocketAddr;

use tokio::net::lookup_host;

use crate::error::{FetchError, Result};

/// Resolve `host` + `service` into candidate TCP endpoints, preserving
/// resolver order. `service` is `"https"`, `"http"`, or a port number in
/// decimal.
pub async fn resolve_endpoints(host: &str, service: &str) -> Result<Vec<SocketAddr>> {
    let port = service_port(service)?;

    let endpoints: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| FetchError::Resolve(format!("Failed to resolve {}:{}: {}", host, service, e)))?
        .collect();

    tracing::debug!(
        "Resolved {}:{} to {} endpoint(s)",
        host,
        service,
        endpoints.len()
    );

    Ok(endpoints)
}

fn service_port(service: &str) -> Result<u16> {
    match service {
        "https" => Ok(443),
        "http" => Ok(80),
        other => other
            .parse()
            .map_err(|_| FetchError::Resolve(format!("Unknown service name: {}", other))),
    }
}
