//! Credential hashing for durable stores.
//!
//! # Invariants
//! - Plain credentials are never persisted or logged.
//! - Hashes are self-describing PHC strings (algorithm, params, salt).

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub struct CredentialError(argon2::password_hash::Error);

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to process credential: {}", self.0)
    }
}

impl Error for CredentialError {}

/// Hashes a credential with Argon2 default parameters and a random salt.
pub fn hash_credential(credential: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(credential.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(CredentialError)
}

/// Returns whether `credential` matches a stored PHC hash.
///
/// Unparseable hashes never match.
pub fn verify_credential(credential: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(credential.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
