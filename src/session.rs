//! The single-request session state machine.
//!
//! A [`SecureSession`] owns one outbound connection for its whole life:
//! connect, TLS handshake, one request out, one bounded response in. Stages
//! run strictly one at a time and each one is subject to its own deadline.

use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::config::SessionConfig;
use crate::error::{FetchError, Result, Stage};
use crate::request::Request;

/// Outcome of a completed session.
#[derive(Debug)]
pub struct Response {
    /// Raw bytes received from the peer, at most the configured response cap.
    pub body: Vec<u8>,
    /// Set when the cap stopped the read before end of stream was observed.
    pub truncated: bool,
}

/// One outbound TLS connection carrying exactly one GET request.
///
/// The session walks a linear state machine: connect to the first reachable
/// endpoint, complete the TLS handshake, write the serialized request, read
/// the response up to the configured cap. Any stage failure is terminal and
/// no further I/O is attempted.
pub struct SecureSession {
    endpoints: Vec<SocketAddr>,
    host: String,
    path: String,
    connector: TlsConnector,
    config: SessionConfig,
}

impl SecureSession {
    pub fn new(
        endpoints: Vec<SocketAddr>,
        host: String,
        path: String,
        connector: TlsConnector,
        config: SessionConfig,
    ) -> Self {
        Self {
            endpoints,
            host,
            path,
            connector,
            config,
        }
    }

    /// Drive the session to its terminal state.
    ///
    /// Consumes the session, so a finished session cannot be re-run. The
    /// returned future resolves exactly once, with either the response or
    /// the first stage error. A stage that outlives its deadline is
    /// cancelled and reported as [`FetchError::Timeout`].
    pub async fn fetch(self) -> Result<Response> {
        let stream =
            with_deadline(Stage::Connect, self.config.connect_timeout, self.connect()).await?;

        let mut stream = with_deadline(
            Stage::Handshake,
            self.config.handshake_timeout,
            self.handshake(stream),
        )
        .await?;

        with_deadline(
            Stage::Write,
            self.config.write_timeout,
            self.send_request(&mut stream),
        )
        .await?;

        with_deadline(
            Stage::Read,
            self.config.read_timeout,
            self.read_response(&mut stream),
        )
        .await
    }

    /// Try each candidate endpoint in resolver order until one accepts.
    async fn connect(&self) -> Result<TcpStream> {
        let mut last_err = None;

        for endpoint in &self.endpoints {
            tracing::debug!("Connecting to {} ({})", self.host, endpoint);
            match TcpStream::connect(endpoint).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!("Failed to connect to {}: {}", endpoint, e);
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) => FetchError::Connect(format!("Failed to connect to {}: {}", self.host, e)),
            None => FetchError::Connect(format!("No endpoints resolved for {}", self.host)),
        })
    }

    async fn handshake(&self, stream: TcpStream) -> Result<TlsStream<TcpStream>> {
        let server_name = ServerName::try_from(self.host.clone())
            .map_err(|e| FetchError::ServerName(format!("{}: {}", self.host, e)))?;

        self.connector
            .connect(server_name, stream)
            .await
            .map_err(|e| {
                FetchError::Handshake(format!("TLS handshake with {} failed: {}", self.host, e))
            })
    }

    /// Serialize the request once and write it through in one pass.
    async fn send_request(&self, stream: &mut TlsStream<TcpStream>) -> Result<()> {
        let request = Request::get(&self.host, &self.path, &self.config.user_agent);
        let payload = request.serialize();
        if payload.len() > self.config.request_cap {
            return Err(FetchError::RequestTooLarge {
                size: payload.len(),
                cap: self.config.request_cap,
            });
        }

        tracing::debug!("Sending {} request byte(s) to {}", payload.len(), self.host);
        stream.write_all(&payload).await.map_err(|e| {
            FetchError::Write(format!("Failed to send request to {}: {}", self.host, e))
        })?;
        stream.flush().await.map_err(|e| {
            FetchError::Write(format!("Failed to flush request to {}: {}", self.host, e))
        })
    }

    /// Read until the response cap is reached or the peer ends the stream.
    /// A peer that drops the link without a TLS close_notify counts as end
    /// of stream; the bytes received up to that point are the response.
    async fn read_response(&self, stream: &mut TlsStream<TcpStream>) -> Result<Response> {
        let cap = self.config.response_cap;
        let mut body = Vec::new();
        let mut chunk = [0u8; 1024];
        let mut saw_eof = false;

        while body.len() < cap {
            let want = (cap - body.len()).min(chunk.len());
            match stream.read(&mut chunk[..want]).await {
                Ok(0) => {
                    saw_eof = true;
                    break;
                }
                Ok(n) => body.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    tracing::debug!("{} closed without close_notify", self.host);
                    saw_eof = true;
                    break;
                }
                Err(e) => {
                    return Err(FetchError::Read(format!(
                        "Failed to read response from {}: {}",
                        self.host, e
                    )))
                }
            }
        }

        let truncated = !saw_eof;
        tracing::debug!(
            "Read {} response byte(s) from {} (truncated: {})",
            body.len(),
            self.host,
            truncated
        );

        Ok(Response { body, truncated })
    }
}

async fn with_deadline<T, F>(stage: Stage, deadline: Duration, op: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(deadline, op).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(stage)),
    }
}
