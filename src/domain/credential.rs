//! Credential hashing.
//!
//! Secrets are stored as Argon2id PHC strings with a random 16-byte salt.
//! Verification goes through the argon2 verifier, which compares digests in
//! constant time.

use std::fmt;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::Rng;

const SALT_LEN: usize = 16;

/// Hash a plaintext secret into a self-describing PHC string.
pub fn hash_secret(secret: &str) -> Result<String, CredentialError> {
    let salt_bytes: [u8; SALT_LEN] = rand::thread_rng().r#gen();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;

    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Returns true iff `secret` matches the stored PHC string.
/// A malformed stored value never verifies.
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    Hashing(String),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Hashing(msg) => write!(f, "failed to hash credential: {}", msg),
        }
    }
}

impl std::error::Error for CredentialError {}
