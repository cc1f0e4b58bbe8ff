//! Request identity key generation.

use sha2::{Digest, Sha256};

/// Compute the store key for a request identity (method + URL).
///
/// The method is case-normalized so `get` and `GET` share an entry.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
