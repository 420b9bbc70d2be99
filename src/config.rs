//! Configuration for client handshakes.

/// Default size of the read and write buffers, in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default upper bound for the server's response head, in bytes.
pub const DEFAULT_MAX_HANDSHAKE_SIZE: usize = 8192;

/// Client handshake configuration.
///
/// The buffer sizes control the [`Connection`](crate::Connection) wrapper that
/// performs the handshake and is then handed to the caller. They have no
/// protocol-level effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Read buffer size (in bytes).
    ///
    /// Default: 8 KB (8192)
    pub read_buffer_size: usize,

    /// Write buffer size (in bytes).
    ///
    /// Default: 8 KB (8192)
    pub write_buffer_size: usize,

    /// Maximum size of the response head (status line and headers).
    ///
    /// Default: 8 KB (8192)
    pub max_handshake_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_BUFFER_SIZE,
            write_buffer_size: DEFAULT_BUFFER_SIZE,
            max_handshake_size: DEFAULT_MAX_HANDSHAKE_SIZE,
        }
    }
}

impl Config {
    /// Create a new configuration with default sizes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration suitable for small embedded systems.
    ///
    /// - Read buffer: 4 KB
    /// - Write buffer: 4 KB
    /// - Max handshake: 4 KB
    #[must_use]
    pub const fn embedded() -> Self {
        Self {
            read_buffer_size: 4096,
            write_buffer_size: 4096,
            max_handshake_size: 4096,
        }
    }

    /// Set read buffer size. Zero selects the default.
    #[must_use]
    pub const fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set write buffer size. Zero selects the default.
    #[must_use]
    pub const fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Set the maximum response head size.
    #[must_use]
    pub const fn with_max_handshake_size(mut self, size: usize) -> Self {
        self.max_handshake_size = size;
        self
    }

    /// Read buffer size with zero mapped to the default.
    #[must_use]
    pub const fn effective_read_buffer_size(&self) -> usize {
        if self.read_buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            self.read_buffer_size
        }
    }

    /// Write buffer size with zero mapped to the default.
    #[must_use]
    pub const fn effective_write_buffer_size(&self) -> usize {
        if self.write_buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            self.write_buffer_size
        }
    }

    /// Validate that the buffered response head is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeTooLarge`](crate::Error::HandshakeTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_handshake_size {
            Err(crate::Error::HandshakeTooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }
}
