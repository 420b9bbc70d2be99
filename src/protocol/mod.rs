//! WebSocket opening handshake, client side (RFC 6455 Section 4).
//!
//! Everything here is runtime-agnostic: key generation, accept key
//! computation, request serialization and response validation work on plain
//! buffers. The async transport plumbing lives in [`crate::connection`].

pub mod accept;
pub mod headers;
pub mod key;
pub mod request;
pub mod response;

pub use accept::{AcceptHasher, Sha1Hasher, WS_GUID, compute_accept_key, compute_accept_key_with};
pub use headers::Headers;
pub use key::{NONCE_LEN, OsRandom, RandomSource, generate_challenge_key};
pub use request::{HandshakeRequest, WS_VERSION};
pub use response::HandshakeResponse;
