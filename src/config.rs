use std::time::Duration;

use crate::request;

/// Default capacity for both the request and response buffers.
pub const DEFAULT_BUFFER_CAP: usize = 1024;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-session knobs: buffer capacities, per-stage deadlines, and the
/// `User-Agent` value sent with the request.
///
/// A request serialized beyond `request_cap` is rejected before any bytes go
/// out; a response longer than `response_cap` is truncated at the cap and
/// flagged on the completed [`Response`](crate::session::Response).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub request_cap: usize,
    pub response_cap: usize,
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
    pub write_timeout: Duration,
    pub read_timeout: Duration,
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_cap: DEFAULT_BUFFER_CAP,
            response_cap: DEFAULT_BUFFER_CAP,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            user_agent: request::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_caps() {
        let config = SessionConfig::default();
        assert_eq!(config.request_cap, 1024);
        assert_eq!(config.response_cap, 1024);
    }

    #[test]
    fn test_default_user_agent_names_the_crate() {
        let config = SessionConfig::default();
        assert!(config.user_agent.starts_with("tlsfetch/"));
    }
}
