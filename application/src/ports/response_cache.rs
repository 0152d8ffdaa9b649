//! Response cache port
//!
//! Maps a request [`Fingerprint`] to a previously obtained oracle response.
//! No TTL is assumed at this layer.

use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic key for one request: SHA-256 over prompt, model and
/// provider, NUL-separated, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(prompt: &str, model: &str, provider: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        hasher.update([0u8]);
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(provider.as_bytes());
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            hex.push_str(&format!("{:02x}", byte));
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage for oracle responses.
///
/// Both methods are infallible: a broken cache behaves like a miss.
pub trait ResponseCache: Send + Sync {
    fn get(&self, fingerprint: &Fingerprint) -> Option<Vec<String>>;

    fn put(&self, fingerprint: &Fingerprint, lines: &[String]);
}

/// Cache that never stores anything (`--no-cache`).
pub struct NoCache;

impl ResponseCache for NoCache {
    fn get(&self, _fingerprint: &Fingerprint) -> Option<Vec<String>> {
        None
    }

    fn put(&self, _fingerprint: &Fingerprint, _lines: &[String]) {}
}
