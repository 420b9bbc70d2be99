//! Client opening handshake over a caller-supplied transport.
//!
//! [`client_connect`] drives one handshake attempt: it generates a fresh
//! Sec-WebSocket-Key, sends the upgrade request, reads one response head and
//! applies the acceptance rule. On success the transport moves into the
//! returned [`Connection`]; on failure it is handed back, unclosed, inside a
//! [`HandshakeFailure`].
//!
//! There is no timeout or retry logic here. Bound the future with
//! `tokio::time::timeout` or rely on the transport's own deadlines; a retry is
//! a new call with a new key.

use std::fmt;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;
use url::{Host, Url};

use crate::config::Config;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::protocol::{
    AcceptHasher, HandshakeRequest, Headers, OsRandom, RandomSource, Sha1Hasher,
    compute_accept_key_with, generate_challenge_key,
};

/// A failed handshake attempt together with the transport it ran on.
///
/// The library never closes the transport; the caller decides whether to
/// drop it or reuse it for something else.
pub struct HandshakeFailure<T> {
    error: Error,
    io: T,
}

impl<T> HandshakeFailure<T> {
    fn new(error: Error, io: T) -> Self {
        Self { error, io }
    }

    /// The reason the attempt failed.
    #[must_use]
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Drop the transport and keep the error.
    #[must_use]
    pub fn into_error(self) -> Error {
        self.error
    }

    /// Take back the transport.
    #[must_use]
    pub fn into_transport(self) -> T {
        self.io
    }

    /// Split into the error and the transport.
    #[must_use]
    pub fn into_parts(self) -> (Error, T) {
        (self.error, self.io)
    }
}

impl<T> fmt::Debug for HandshakeFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeFailure")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for HandshakeFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T> std::error::Error for HandshakeFailure<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result of a handshake attempt: the connection and negotiated subprotocol.
pub type HandshakeResult<T> = std::result::Result<(Connection<T>, String), HandshakeFailure<T>>;

/// Handshake driver with pluggable randomness and digest.
///
/// `Handshaker::new(config)` uses the OS CSPRNG and SHA-1. Tests swap in
/// deterministic sources with [`Handshaker::with_parts`].
#[derive(Debug, Clone, Default)]
pub struct Handshaker<R = OsRandom, H = Sha1Hasher> {
    random: R,
    hasher: H,
    config: Config,
}

impl Handshaker {
    /// Create a handshaker with the OS random source and SHA-1.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            random: OsRandom,
            hasher: Sha1Hasher,
            config,
        }
    }
}

impl<R: RandomSource, H: AcceptHasher> Handshaker<R, H> {
    /// Create a handshaker from explicit collaborators.
    #[must_use]
    pub fn with_parts(random: R, hasher: H, config: Config) -> Self {
        Self {
            random,
            hasher,
            config,
        }
    }

    /// The configuration applied to each attempt.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one handshake attempt over `io` for `url`.
    ///
    /// `headers` are appended after the mandatory headers in the given order.
    ///
    /// # Errors
    ///
    /// On any failure the transport is returned inside [`HandshakeFailure`]:
    /// - [`Error::RandomnessUnavailable`] if no nonce could be generated
    /// - [`Error::InvalidUrl`] / [`Error::InvalidHeaderValue`] for unusable input
    /// - [`Error::TransportWrite`] if the request could not be sent
    /// - [`Error::TransportRead`] / [`Error::HandshakeTooLarge`] if no complete
    ///   response head could be read
    /// - [`Error::BadHandshake`] if the response fails the acceptance rule
    pub async fn connect<T>(&mut self, io: T, url: &Url, headers: Headers) -> HandshakeResult<T>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let key = match generate_challenge_key(&mut self.random) {
            Ok(key) => key,
            Err(error) => return Err(HandshakeFailure::new(error, io)),
        };
        let expected_accept = compute_accept_key_with(&self.hasher, &key);

        let request = match HandshakeRequest::new(url, key, headers) {
            Ok(request) => request,
            Err(error) => return Err(HandshakeFailure::new(error, io)),
        };

        let mut conn = Connection::new(io, &self.config);
        match negotiate(&mut conn, &request, &expected_accept, &self.config).await {
            Ok(protocol) => {
                debug!(url = %url, protocol = %protocol, "Handshake complete");
                conn.set_subprotocol(protocol.clone());
                Ok((conn, protocol))
            }
            Err(error) => {
                debug!(url = %url, error = %error, "Handshake failed");
                Err(HandshakeFailure::new(error, conn.into_inner()))
            }
        }
    }
}

async fn negotiate<T>(
    conn: &mut Connection<T>,
    request: &HandshakeRequest,
    expected_accept: &str,
    config: &Config,
) -> Result<String>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    debug!(host = %request.host, target = %request.target, "Sending handshake request");
    conn.send_request(request).await?;
    let response = conn.read_response(config).await?;
    response.validate(expected_accept)
}

/// Perform the client handshake over an established transport.
///
/// This is [`Handshaker::connect`] with the OS random source and SHA-1.
///
/// # Errors
///
/// See [`Handshaker::connect`].
pub async fn client_connect<T>(
    io: T,
    url: &Url,
    headers: Headers,
    config: Config,
) -> HandshakeResult<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    Handshaker::new(config).connect(io, url, headers).await
}

/// Dial `url` over TCP and perform the client handshake.
///
/// Only plain `ws://` (or `http://`) targets are supported; TLS setup belongs
/// to the caller, who can dial a TLS stream and use [`client_connect`].
/// Since this function owns the socket, it is dropped on failure.
///
/// # Errors
///
/// - [`Error::InvalidUrl`] for an unparsable or `wss://` URL
/// - [`Error::Dial`] if the TCP connection cannot be established
/// - any error from [`client_connect`]
pub async fn connect_async(
    url: &str,
    headers: Headers,
    config: Config,
) -> Result<(Connection<TcpStream>, String)> {
    let url = Url::parse(url)?;
    match url.scheme() {
        "ws" | "http" => {}
        "wss" | "https" => {
            return Err(Error::InvalidUrl(format!(
                "TLS targets need a caller-supplied stream: {}",
                url
            )));
        }
        other => {
            return Err(Error::InvalidUrl(format!("unsupported scheme: {}", other)));
        }
    }

    let port = url
        .port_or_known_default()
        .ok_or_else(|| Error::InvalidUrl(format!("missing port: {}", url)))?;
    let dial = |e: std::io::Error| Error::Dial {
        kind: e.kind(),
        message: e.to_string(),
    };

    let stream = match url.host() {
        Some(Host::Domain(domain)) => TcpStream::connect((domain, port)).await.map_err(dial)?,
        Some(Host::Ipv4(ip)) => TcpStream::connect(SocketAddr::from((ip, port)))
            .await
            .map_err(dial)?,
        Some(Host::Ipv6(ip)) => TcpStream::connect(SocketAddr::from((ip, port)))
            .await
            .map_err(dial)?,
        None => return Err(Error::InvalidUrl(format!("missing host: {}", url))),
    };
    debug!(url = %url, "TCP connection established");

    client_connect(stream, &url, headers, config)
        .await
        .map_err(HandshakeFailure::into_error)
}
