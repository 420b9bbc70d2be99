//! Sec-WebSocket-Key generation.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::{Error, Result};

/// Number of random bytes in a challenge nonce (RFC 6455 Section 4.1).
pub const NONCE_LEN: usize = 16;

/// Source of the random bytes used for challenge nonces.
///
/// Production code uses [`OsRandom`]. Tests substitute a deterministic source
/// to make the request bytes reproducible.
pub trait RandomSource {
    /// Fill `buf` entirely with random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RandomnessUnavailable`] if the source cannot deliver.
    fn fill(&mut self, buf: &mut [u8]) -> Result<()>;
}

/// Operating system CSPRNG via `getrandom`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        getrandom::getrandom(buf).map_err(|e| Error::RandomnessUnavailable(e.to_string()))
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).fill(buf)
    }
}

/// Generate a fresh Sec-WebSocket-Key: Base64 of 16 random bytes.
///
/// The result is always 24 characters, standard alphabet with padding.
///
/// # Errors
///
/// Returns [`Error::RandomnessUnavailable`] if `random` fails.
pub fn generate_challenge_key<R: RandomSource + ?Sized>(random: &mut R) -> Result<String> {
    let mut nonce = [0u8; NONCE_LEN];
    random.fill(&mut nonce)?;
    Ok(BASE64.encode(nonce))
}
