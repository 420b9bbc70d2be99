//! Sec-WebSocket-Accept computation (RFC 6455 Section 4.2.2).

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Digest used to derive the accept key.
///
/// The protocol mandates SHA-1 ([`Sha1Hasher`]); the trait exists so the
/// orchestrator can be driven by a fake in tests.
pub trait AcceptHasher {
    /// Digest the concatenation of `parts`.
    fn digest(&self, parts: &[&[u8]]) -> Vec<u8>;
}

/// SHA-1 accept hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Hasher;

impl AcceptHasher for Sha1Hasher {
    fn digest(&self, parts: &[&[u8]]) -> Vec<u8> {
        let mut hasher = Sha1::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().to_vec()
    }
}

impl<H: AcceptHasher + ?Sized> AcceptHasher for &H {
    fn digest(&self, parts: &[&[u8]]) -> Vec<u8> {
        (**self).digest(parts)
    }
}

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use wsdial::protocol::accept::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    compute_accept_key_with(&Sha1Hasher, key)
}

/// Same as [`compute_accept_key`] with an explicit hasher.
#[must_use]
pub fn compute_accept_key_with<H: AcceptHasher + ?Sized>(hasher: &H, key: &str) -> String {
    BASE64.encode(hasher.digest(&[key.as_bytes(), WS_GUID.as_bytes()]))
}
