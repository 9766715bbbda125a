//! HTTP/1.1 GET request serialization.
//!
//! The whole wire contract on the send side: one request line, a `Host`
//! header, a `User-Agent` header, and the empty line ending the header
//! block. The request is serialized exactly once per session and written
//! through the encrypted stream in one pass.

/// Default `User-Agent` value advertised by this client.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A single outgoing GET request.
#[derive(Debug, Clone)]
pub struct Request {
    host: String,
    path: String,
    user_agent: String,
}

impl Request {
    /// Build a GET request for `path` on `host`. A path without a leading
    /// slash (including the empty path) is normalized to one.
    pub fn get(host: &str, path: &str, user_agent: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        Self {
            host: host.to_string(),
            path,
            user_agent: user_agent.to_string(),
        }
    }

    /// Serialize the request into the bytes sent on the wire.
    pub fn serialize(&self) -> Vec<u8> {
        format!(
            "GET {} HTTP/1.1\r\n\
             Host: {}\r\n\
             User-Agent: {}\r\n\
             \r\n",
            self.path, self.host, self.user_agent
        )
        .into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let request = Request::get("api.binance.com", "/api/v3/trades", "tlsfetch/0.1.0");
        let bytes = request.serialize();
        let text = std::str::from_utf8(&bytes).unwrap();

        assert!(text.starts_with("GET /api/v3/trades HTTP/1.1\r\n"));
        assert!(text.ends_with("\r\n\r\n"));

        let lines: Vec<&str> = text.trim_end_matches("\r\n").split("\r\n").collect();
        assert_eq!(
            lines,
            vec![
                "GET /api/v3/trades HTTP/1.1",
                "Host: api.binance.com",
                "User-Agent: tlsfetch/0.1.0",
            ]
        );
    }

    #[test]
    fn test_header_order_is_host_then_user_agent() {
        // The relative order must hold for any host value.
        for host in ["example.test", "127.0.0.1", "a.very.long.host.name.example"] {
            let text =
                String::from_utf8(Request::get(host, "/", "agent/1").serialize()).unwrap();
            let host_at = text.find("Host: ").unwrap();
            let agent_at = text.find("User-Agent: ").unwrap();
            assert!(host_at < agent_at);
            assert_eq!(text.matches("HTTP/1.1").count(), 1);
        }
    }

    #[test]
    fn test_path_is_normalized() {
        let bare = Request::get("example.test", "status", "agent/1");
        assert!(String::from_utf8(bare.serialize())
            .unwrap()
            .starts_with("GET /status HTTP/1.1\r\n"));

        let empty = Request::get("example.test", "", "agent/1");
        assert!(String::from_utf8(empty.serialize())
            .unwrap()
            .starts_with("GET / HTTP/1.1\r\n"));
    }
}
