//! # wsdial - WebSocket client opening handshake
//!
//! `wsdial` performs the client side of the RFC 6455 opening handshake over
//! any async transport and hands back a buffered connection ready for a frame
//! codec to take over.
//!
//! ## Features
//!
//! - **Exact acceptance rule**: status 101, `Upgrade: websocket`,
//!   `Connection: upgrade`, matching `Sec-WebSocket-Accept`
//! - **Deterministic request bytes** with caller headers in caller order
//! - **No lost bytes**: data sent behind the response head stays buffered
//! - **Transport ownership** returns to the caller on every failure
//! - **Pluggable randomness and digest** for reproducible tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wsdial::{client_connect, Config, Headers};
//!
//! let stream = tokio::net::TcpStream::connect("example.com:80").await?;
//! let url = url::Url::parse("ws://example.com/chat")?;
//! let headers = Headers::new().origin("http://example.com").protocols(["chat"]);
//!
//! match client_connect(stream, &url, headers, Config::default()).await {
//!     Ok((conn, protocol)) => println!("open, subprotocol {:?}", protocol),
//!     Err(failure) => {
//!         eprintln!("handshake failed: {}", failure);
//!         drop(failure.into_transport());
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod protocol;

#[cfg(feature = "async-tokio")]
pub mod client;
#[cfg(feature = "async-tokio")]
pub mod connection;

pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{
    AcceptHasher, HandshakeRequest, HandshakeResponse, Headers, OsRandom, RandomSource,
    Sha1Hasher, WS_GUID, compute_accept_key, generate_challenge_key,
};

#[cfg(feature = "async-tokio")]
pub use client::{HandshakeFailure, HandshakeResult, Handshaker, client_connect, connect_async};
#[cfg(feature = "async-tokio")]
pub use connection::Connection;
