use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tracing::trace;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::{HandshakeRequest, HandshakeResponse};

/// A buffered transport that has completed (or is performing) the opening
/// handshake.
///
/// The same value carries the handshake and the data phase: bytes the server
/// sent right after its response head stay in the read buffer and are the
/// first bytes returned by [`AsyncRead`]. Writes are buffered up to the
/// configured write buffer size and reach the transport on flush.
///
/// ## Type Parameters
///
/// - `T`: The underlying async I/O stream (e.g., `TcpStream`, `TlsStream`)
///
/// ## Example
///
/// ```rust,ignore
/// use wsdial::{client_connect, Config, Headers};
///
/// let stream = tokio::net::TcpStream::connect("localhost:9001").await?;
/// let url = "ws://localhost:9001/chat".parse()?;
/// let (mut conn, protocol) = client_connect(stream, &url, Headers::new(), Config::default())
///     .await
///     .map_err(|failure| failure.into_error())?;
///
/// // Hand `conn` to a frame codec; it implements AsyncRead + AsyncWrite.
/// ```
pub struct Connection<T> {
    io: T,
    read_buf: BytesMut,
    write_buf: BytesMut,
    read_capacity: usize,
    write_capacity: usize,
    subprotocol: String,
}

impl<T> Connection<T> {
    pub(crate) fn new(io: T, config: &Config) -> Self {
        let read_capacity = config.effective_read_buffer_size();
        let write_capacity = config.effective_write_buffer_size();
        Self {
            io,
            read_buf: BytesMut::with_capacity(read_capacity),
            write_buf: BytesMut::with_capacity(write_capacity),
            read_capacity,
            write_capacity,
            subprotocol: String::new(),
        }
    }

    /// The subprotocol selected by the server, or `""` if none.
    #[must_use]
    pub fn subprotocol(&self) -> &str {
        &self.subprotocol
    }

    pub(crate) fn set_subprotocol(&mut self, subprotocol: String) {
        self.subprotocol = subprotocol;
    }

    /// Bytes received from the transport but not yet read by the caller.
    ///
    /// Right after a successful handshake this holds whatever the server sent
    /// behind its response head, and is empty if it sent nothing more.
    #[must_use]
    pub fn read_buffer(&self) -> &[u8] {
        &self.read_buf
    }

    /// Bytes written but not yet flushed to the transport.
    #[must_use]
    pub fn write_buffer(&self) -> &[u8] {
        &self.write_buf
    }

    /// Shared access to the underlying transport.
    #[must_use]
    pub fn get_ref(&self) -> &T {
        &self.io
    }

    /// Mutable access to the underlying transport.
    ///
    /// Reading from it directly skips any bytes still in the read buffer.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.io
    }

    /// Split into the transport and the unread buffered bytes.
    ///
    /// Unflushed writes are dropped; flush first.
    #[must_use]
    pub fn into_parts(self) -> (T, BytesMut) {
        (self.io, self.read_buf)
    }

    /// Return the underlying transport, discarding buffered bytes.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Connection<T> {
    /// Serialize `request` into the write buffer and flush it in one send.
    pub(crate) async fn send_request(&mut self, request: &HandshakeRequest) -> Result<()> {
        request.write(&mut self.write_buf);
        trace!(bytes = self.write_buf.len(), "Sending handshake request");
        self.flush().await.map_err(|e| Error::write(&e))
    }

    /// Read exactly one response head, leaving any following bytes buffered.
    pub(crate) async fn read_response(&mut self, config: &Config) -> Result<HandshakeResponse> {
        loop {
            if let Some((response, consumed)) = HandshakeResponse::parse(&self.read_buf)? {
                config.check_handshake_size(consumed)?;
                self.read_buf.advance(consumed);
                trace!(
                    consumed,
                    leftover = self.read_buf.len(),
                    "Handshake response complete"
                );
                return Ok(response);
            }

            config.check_handshake_size(self.read_buf.len())?;

            if self.read_buf.capacity() == self.read_buf.len() {
                self.read_buf.reserve(self.read_capacity);
            }

            // Never buffer more than one byte past the limit while the head
            // is still incomplete.
            let remaining = config.max_handshake_size.saturating_add(1) - self.read_buf.len();
            let n = AsyncReadExt::take(&mut self.io, remaining as u64)
                .read_buf(&mut self.read_buf)
                .await
                .map_err(|e| Error::read(&e))?;
            if n == 0 {
                return Err(Error::TransportRead {
                    kind: io::ErrorKind::UnexpectedEof,
                    message: format!(
                        "connection closed after {} bytes of response head",
                        self.read_buf.len()
                    ),
                });
            }
            trace!(bytes = n, buffered = self.read_buf.len(), "Read response bytes");
        }
    }
}

impl<T: AsyncWrite + Unpin> Connection<T> {
    fn poll_flush_buf(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while !self.write_buf.is_empty() {
            let n = ready!(Pin::new(&mut self.io).poll_write(cx, &self.write_buf))?;
            if n == 0 {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write buffered data",
                )));
            }
            self.write_buf.advance(n);
        }
        Poll::Ready(Ok(()))
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for Connection<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.read_buf.is_empty() {
            return Pin::new(&mut this.io).poll_read(cx, buf);
        }
        let n = this.read_buf.len().min(buf.remaining());
        buf.put_slice(&this.read_buf[..n]);
        this.read_buf.advance(n);
        Poll::Ready(Ok(()))
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for Connection<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.write_buf.len() + buf.len() > this.write_capacity {
            ready!(this.poll_flush_buf(cx))?;
        }
        if buf.len() >= this.write_capacity {
            Pin::new(&mut this.io).poll_write(cx, buf)
        } else {
            this.write_buf.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_flush_buf(cx))?;
        Pin::new(&mut this.io).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_flush_buf(cx))?;
        Pin::new(&mut this.io).poll_shutdown(cx)
    }
}

impl<T> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("subprotocol", &self.subprotocol)
            .field("read_buffered", &self.read_buf.len())
            .field("write_buffered", &self.write_buf.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Headers;
    use std::io::Cursor;
    use url::Url;

    struct MockStream {
        read_data: Cursor<Vec<u8>>,
        write_data: Vec<u8>,
        write_calls: usize,
        chunk: usize,
    }

    impl MockStream {
        fn new(data: Vec<u8>) -> Self {
            Self {
                read_data: Cursor::new(data),
                write_data: Vec::new(),
                write_calls: 0,
                chunk: usize::MAX,
            }
        }

        /// Deliver at most `chunk` bytes per read.
        fn trickle(data: Vec<u8>, chunk: usize) -> Self {
            Self {
                chunk,
                ..Self::new(data)
            }
        }
    }

    impl AsyncRead for MockStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let pos = self.read_data.position() as usize;
            let data = self.read_data.get_ref();
            if pos >= data.len() {
                return Poll::Ready(Ok(()));
            }
            let remaining = &data[pos..];
            let to_copy = remaining.len().min(buf.remaining()).min(self.chunk);
            buf.put_slice(&remaining[..to_copy]);
            self.read_data.set_position((pos + to_copy) as u64);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockStream {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            self.write_calls += 1;
            self.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe broken")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    const RESPONSE: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
        \r\n";

    fn request() -> HandshakeRequest {
        let url = Url::parse("ws://example.com/chat").unwrap();
        HandshakeRequest::new(&url, "dGhlIHNhbXBsZSBub25jZQ==", Headers::new()).unwrap()
    }

    #[tokio::test]
    async fn test_send_request_single_write() {
        let mut conn = Connection::new(MockStream::new(vec![]), &Config::default());
        let req = request();
        conn.send_request(&req).await.unwrap();

        let mut expected = BytesMut::new();
        req.write(&mut expected);
        assert_eq!(conn.get_ref().write_data, expected.to_vec());
        assert_eq!(conn.get_ref().write_calls, 1);
        assert!(conn.write_buffer().is_empty());
    }

    #[tokio::test]
    async fn test_send_request_write_failure() {
        let mut conn = Connection::new(BrokenPipe, &Config::default());
        let result = conn.send_request(&request()).await;
        assert!(matches!(
            result,
            Err(Error::TransportWrite { kind: io::ErrorKind::BrokenPipe, .. })
        ));
    }

    #[tokio::test]
    async fn test_read_response_exact() {
        let mut conn = Connection::new(MockStream::new(RESPONSE.to_vec()), &Config::default());
        let response = conn.read_response(&Config::default()).await.unwrap();
        assert_eq!(response.status, 101);
        assert!(conn.read_buffer().is_empty());
    }

    #[tokio::test]
    async fn test_read_response_trickled() {
        let stream = MockStream::trickle(RESPONSE.to_vec(), 3);
        let mut conn = Connection::new(stream, &Config::default());
        let response = conn.read_response(&Config::default()).await.unwrap();
        assert_eq!(response.upgrade.as_deref(), Some("websocket"));
        assert!(conn.read_buffer().is_empty());
    }

    #[tokio::test]
    async fn test_leftover_bytes_kept_for_data_phase() {
        let mut data = RESPONSE.to_vec();
        data.extend_from_slice(&[0x81, 0x02, b'h', b'i']);

        let mut conn = Connection::new(MockStream::new(data), &Config::default());
        conn.read_response(&Config::default()).await.unwrap();
        assert_eq!(conn.read_buffer(), &[0x81, 0x02, b'h', b'i']);

        let mut frame = [0u8; 4];
        conn.read_exact(&mut frame).await.unwrap();
        assert_eq!(frame, [0x81, 0x02, b'h', b'i']);
        assert!(conn.read_buffer().is_empty());
    }

    #[tokio::test]
    async fn test_reads_continue_from_transport() {
        let mut data = RESPONSE.to_vec();
        data.extend_from_slice(b"abcdef");

        // Tiny read buffer: the head arrives in several reads and only part of
        // the trailing bytes may be buffered.
        let config = Config::new().with_read_buffer_size(16);
        let stream = MockStream::trickle(data, 16);
        let mut conn = Connection::new(stream, &config);
        conn.read_response(&config).await.unwrap();

        let mut rest = Vec::new();
        conn.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"abcdef");
    }

    #[tokio::test]
    async fn test_eof_before_head_complete() {
        let stream = MockStream::new(b"HTTP/1.1 101 Switching Protocols\r\n".to_vec());
        let mut conn = Connection::new(stream, &Config::default());
        let result = conn.read_response(&Config::default()).await;
        assert!(matches!(
            result,
            Err(Error::TransportRead { kind: io::ErrorKind::UnexpectedEof, .. })
        ));
    }

    #[tokio::test]
    async fn test_read_error_propagated() {
        let mut conn = Connection::new(BrokenPipe, &Config::default());
        let result = conn.read_response(&Config::default()).await;
        assert!(matches!(
            result,
            Err(Error::TransportRead { kind: io::ErrorKind::ConnectionReset, .. })
        ));
    }

    #[tokio::test]
    async fn test_oversized_head_rejected() {
        let mut data = b"HTTP/1.1 101 Switching Protocols\r\n".to_vec();
        for i in 0..200 {
            data.extend_from_slice(format!("X-Filler-{}: {}\r\n", i, "x".repeat(40)).as_bytes());
        }
        let config = Config::new().with_max_handshake_size(1024);
        let stream = MockStream::trickle(data, 256);
        let mut conn = Connection::new(stream, &config);
        let result = conn.read_response(&config).await;
        assert!(matches!(result, Err(Error::HandshakeTooLarge { max: 1024, .. })));
    }

    #[tokio::test]
    async fn test_complete_oversized_head_in_one_read() {
        let mut data = b"HTTP/1.1 101 Switching Protocols\r\n\
            Upgrade: websocket\r\n\
            Connection: upgrade\r\n"
            .to_vec();
        for i in 0..80 {
            data.extend_from_slice(format!("X-Filler-{}: {}\r\n", i, "x".repeat(40)).as_bytes());
        }
        data.extend_from_slice(b"Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n");
        assert!(data.len() > 4000);

        let config = Config::new().with_max_handshake_size(1024);
        let mut conn = Connection::new(MockStream::new(data), &config);
        let result = conn.read_response(&config).await;
        assert!(matches!(result, Err(Error::HandshakeTooLarge { max: 1024, .. })));
        assert!(conn.read_buffer().len() <= 1025);
    }

    #[tokio::test]
    async fn test_head_at_limit_accepted() {
        let config = Config::new().with_max_handshake_size(RESPONSE.len());
        let mut data = RESPONSE.to_vec();
        data.extend_from_slice(b"trailing frame bytes");
        let mut conn = Connection::new(MockStream::new(data), &config);

        let response = conn.read_response(&config).await.unwrap();
        assert_eq!(response.status, 101);
        assert_eq!(conn.read_buffer(), b"t");

        let mut rest = Vec::new();
        conn.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"trailing frame bytes");
    }

    #[tokio::test]
    async fn test_small_writes_are_buffered() {
        let config = Config::new().with_write_buffer_size(64);
        let mut conn = Connection::new(MockStream::new(vec![]), &config);

        conn.write_all(b"hello").await.unwrap();
        assert_eq!(conn.write_buffer(), b"hello");
        assert!(conn.get_ref().write_data.is_empty());

        conn.flush().await.unwrap();
        assert!(conn.write_buffer().is_empty());
        assert_eq!(conn.get_ref().write_data, b"hello");
    }

    #[tokio::test]
    async fn test_large_write_bypasses_buffer() {
        let config = Config::new().with_write_buffer_size(8);
        let mut conn = Connection::new(MockStream::new(vec![]), &config);

        conn.write_all(b"abc").await.unwrap();
        conn.write_all(b"0123456789").await.unwrap();
        assert!(conn.write_buffer().is_empty());
        assert_eq!(conn.get_ref().write_data, b"abc0123456789");
    }

    #[test]
    fn test_into_parts() {
        let mut conn = Connection::new(MockStream::new(vec![]), &Config::default());
        conn.read_buf.extend_from_slice(b"xy");
        conn.set_subprotocol("chat".into());
        assert_eq!(conn.subprotocol(), "chat");

        let (_io, leftover) = conn.into_parts();
        assert_eq!(&leftover[..], b"xy");
    }
}
