//! Server handshake response parsing and validation (RFC 6455 Section 4.2.2).

use httparse::Status;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Header slots tried first when parsing a response head. The parse grows
/// the storage when a head carries more; only the head's size is bounded.
pub const INITIAL_HEADERS: usize = 64;

/// The parts of the server's response the client acceptance rule looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// HTTP status code.
    pub status: u16,
    /// The Upgrade header value (first occurrence).
    pub upgrade: Option<String>,
    /// The Connection header value (first occurrence).
    pub connection: Option<String>,
    /// The Sec-WebSocket-Accept header value (first occurrence).
    pub accept: Option<String>,
    /// The selected Sec-WebSocket-Protocol (optional).
    pub protocol: Option<String>,
}

impl HandshakeResponse {
    /// Parse one HTTP response head from the start of `buf`.
    ///
    /// Returns `Ok(None)` while the head is incomplete, and otherwise the
    /// response together with the number of bytes it occupied. Bytes past
    /// the head are never consumed; there is no response body for this
    /// exchange.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportRead`] if the bytes are not a well-formed
    /// HTTP/1.x response head.
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>> {
        // A header line is at least three bytes ("a:\n"), so the head in
        // `buf` can never hold more than this many headers.
        let ceiling = buf.len() / 3 + 1;
        let mut slots = INITIAL_HEADERS;

        loop {
            let mut storage = vec![httparse::EMPTY_HEADER; slots];
            let mut raw = httparse::Response::new(&mut storage);

            let consumed = match raw.parse(buf) {
                Ok(Status::Partial) => return Ok(None),
                Ok(Status::Complete(n)) => n,
                Err(httparse::Error::TooManyHeaders) if slots < ceiling => {
                    slots = (slots * 2).min(ceiling);
                    trace!(slots, "Growing response header storage");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let status = raw.code.ok_or_else(|| Error::TransportRead {
                kind: std::io::ErrorKind::InvalidData,
                message: "response has no status code".into(),
            })?;

            let find = |name: &str| {
                raw.headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case(name))
                    .map(|h| String::from_utf8_lossy(h.value.trim_ascii()).into_owned())
            };

            let response = Self {
                status,
                upgrade: find("upgrade"),
                connection: find("connection"),
                accept: find("sec-websocket-accept"),
                protocol: find("sec-websocket-protocol"),
            };

            debug!(status, consumed, "Parsed handshake response head");
            return Ok(Some((response, consumed)));
        }
    }

    /// Apply the client acceptance rule and return the negotiated subprotocol.
    ///
    /// Checks run in order and stop at the first failure:
    /// 1. status is 101
    /// 2. `Upgrade` equals `websocket`, ignoring ASCII case
    /// 3. `Connection` equals `upgrade`, ignoring ASCII case
    /// 4. `Sec-WebSocket-Accept` equals `expected_accept` exactly
    ///
    /// A missing header fails its check. The subprotocol is empty when the
    /// server did not select one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadHandshake`] naming the failed check.
    pub fn validate(&self, expected_accept: &str) -> Result<String> {
        if self.status != 101 {
            return Err(bad_handshake(format!("unexpected status {}", self.status)));
        }

        match self.upgrade.as_deref() {
            Some(v) if v.eq_ignore_ascii_case("websocket") => {}
            Some(v) => return Err(bad_handshake(format!("invalid Upgrade header: {}", v))),
            None => return Err(bad_handshake("missing Upgrade header".into())),
        }

        match self.connection.as_deref() {
            Some(v) if v.eq_ignore_ascii_case("upgrade") => {}
            Some(v) => {
                return Err(bad_handshake(format!("invalid Connection header: {}", v)));
            }
            None => return Err(bad_handshake("missing Connection header".into())),
        }

        match self.accept.as_deref() {
            Some(v) if v.as_bytes() == expected_accept.as_bytes() => {}
            Some(_) => return Err(bad_handshake("Sec-WebSocket-Accept mismatch".into())),
            None => return Err(bad_handshake("missing Sec-WebSocket-Accept header".into())),
        }

        Ok(self.protocol.clone().unwrap_or_default())
    }
}

fn bad_handshake(reason: String) -> Error {
    debug!(reason = %reason, "Rejected handshake response");
    Error::BadHandshake(reason)
}
