use std::fmt;

use thiserror::Error;

/// The session stage an error or deadline is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Handshake,
    Write,
    Read,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::Handshake => "TLS handshake",
            Stage::Write => "request write",
            Stage::Read => "response read",
        };
        f.write_str(name)
    }
}

/// Terminal failures of a fetch session. Each one ends the session; there is
/// no retry at this layer.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Resolve error: {0}")]
    Resolve(String),

    #[error("Invalid server name: {0}")]
    ServerName(String),

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("Connect error: {0}")]
    Connect(String),

    #[error("Handshake error: {0}")]
    Handshake(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Read error: {0}")]
    Read(String),

    #[error("Timed out during {0}")]
    Timeout(Stage),

    #[error("Request too large: {size} bytes exceeds the {cap} byte buffer")]
    RequestTooLarge { size: usize, cap: usize },
}

pub type Result<T> = std::result::Result<T, FetchError>;
