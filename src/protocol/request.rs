//! Client opening handshake request (RFC 6455 Section 4.1).

use bytes::{BufMut, BytesMut};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::headers::Headers;

/// Value of the `Sec-WebSocket-Version` header.
pub const WS_VERSION: &str = "13";

/// A client handshake request ready to be serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Request target: path and optional query (e.g. `/chat?room=1`).
    pub target: String,
    /// The Host header value, with the port when it is not the default.
    pub host: String,
    /// The Sec-WebSocket-Key header value.
    pub key: String,
    /// Caller-supplied headers, written after the mandatory ones.
    pub headers: Headers,
}

impl HandshakeRequest {
    /// Build a request for `url` carrying the challenge `key`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the scheme is not `ws`, `wss`, `http` or
    ///   `https`, or the URL has no host.
    /// - [`Error::InvalidHeaderValue`] if a caller header cannot be written
    ///   as a single line.
    pub fn new(url: &Url, key: impl Into<String>, headers: Headers) -> Result<Self> {
        match url.scheme() {
            "ws" | "wss" | "http" | "https" => {}
            other => {
                return Err(Error::InvalidUrl(format!(
                    "unsupported scheme: {}",
                    other
                )));
            }
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidUrl(format!("missing host: {}", url)))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        headers.validate()?;

        Ok(Self {
            target: request_target(url),
            host,
            key: key.into(),
            headers,
        })
    }

    /// Serialize the request into `buf`.
    ///
    /// All lines end with CRLF and the head is terminated by an empty line.
    pub fn write(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());

        buf.put_slice(b"GET ");
        buf.put_slice(self.target.as_bytes());
        buf.put_slice(b" HTTP/1.1\r\nHost: ");
        buf.put_slice(self.host.as_bytes());
        buf.put_slice(b"\r\nUpgrade: websocket\r\nConnection: upgrade\r\nSec-WebSocket-Version: ");
        buf.put_slice(WS_VERSION.as_bytes());
        buf.put_slice(b"\r\nSec-WebSocket-Key: ");
        buf.put_slice(self.key.as_bytes());
        buf.put_slice(b"\r\n");

        for (name, value) in self.headers.iter() {
            buf.put_slice(name.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"\r\n");
    }

    /// Exact number of bytes [`write`](Self::write) produces.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        const FIXED: &[&str] = &[
            "GET ",
            " HTTP/1.1\r\nHost: ",
            "\r\nUpgrade: websocket\r\nConnection: upgrade\r\nSec-WebSocket-Version: ",
            WS_VERSION,
            "\r\nSec-WebSocket-Key: ",
            "\r\n",
            "\r\n",
        ];
        let fixed: usize = FIXED.iter().map(|s| s.len()).sum();
        let extra: usize = self
            .headers
            .iter()
            .map(|(n, v)| n.len() + v.len() + 4)
            .sum();
        fixed + self.target.len() + self.host.len() + self.key.len() + extra
    }
}

fn request_target(url: &Url) -> String {
    let path = match url.path() {
        "" => "/",
        p => p,
    };
    match url.query() {
        Some(q) => format!("{}?{}", path, q),
        None => path.to_string(),
    }
}
