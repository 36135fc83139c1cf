//! Credential generation primitives
//!
//! Random secrets, machine-to-machine passwords, and the coordination
//! service's ACL digest format. Interactive password collection lives in
//! [`crate::input`]; everything here is non-blocking.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::distr::{Alphanumeric, SampleString};
use sha1::{Digest, Sha1};

/// Default number of random bytes in a generated secret, before encoding.
pub const DEFAULT_SECRET_BYTES: usize = 33;

/// Default length of a generated machine-to-machine password.
pub const DEFAULT_PASSWORD_LEN: usize = 16;

/// Cryptographically sourced random bytes, base64 encoded.
pub fn random_secret(size: usize) -> String {
    let mut bytes = vec![0u8; size];
    rand::rng().fill_bytes(&mut bytes);
    STANDARD.encode(&bytes)
}

/// A generated secret of the default size.
pub fn default_secret() -> String {
    random_secret(DEFAULT_SECRET_BYTES)
}

/// Random password drawn from letters and digits.
///
/// Used for machine-to-machine credentials and as the unattended fallback
/// when no terminal is available to prompt on.
pub fn random_password(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::rng(), len)
}

/// Coordination-service ACL digest: base64 of SHA-1 over `user:secret`.
pub fn hashed_digest(user: &str, secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(user.as_bytes());
    hasher.update(b":");
    hasher.update(secret.as_bytes());
    STANDARD.encode(hasher.finalize())
}
