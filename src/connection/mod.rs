//! Buffered transport handle shared by the handshake and the data phase.
//!
//! The [`Connection`] is created once per handshake attempt. It serializes the
//! upgrade request into its write buffer and parses the response out of its
//! read buffer, so any bytes the server sent behind the response head are
//! still there when a frame codec takes over.
//!
//! ## Lifecycle
//!
//! 1. **Handshake** - request written, one response head read and validated
//! 2. **Open** - returned to the caller, who reads and writes frames through it
//!
//! A failed handshake never yields a `Connection`; the raw transport goes back
//! to the caller instead.

#[allow(clippy::module_inception)]
mod connection;

pub use connection::Connection;
