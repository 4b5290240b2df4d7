//! Credential generation
//!
//! Database passwords, the daemon API key and the panel encryption key all
//! become live credentials, so every byte comes from the operating system's
//! CSPRNG via `getrandom`. Nothing is cached: each call is independent.

use base64::Engine as _;
use thiserror::Error;

/// Prefix the panel framework expects on a base64 application key.
pub const ENCRYPTION_KEY_PREFIX: &str = "base64:";

/// Raw length of the application encryption key.
pub const ENCRYPTION_KEY_BYTES: usize = 32;

/// Length of generated database passwords.
pub const DB_PASSWORD_LEN: usize = 24;

/// Length of the daemon API key.
pub const API_KEY_LEN: usize = 32;

/// Errors from the random source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("random source unavailable: {0}")]
    RandomSource(String),
}

fn random_bytes(len: usize) -> Result<Vec<u8>, CredentialError> {
    let mut bytes = vec![0u8; len];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| CredentialError::RandomSource(e.to_string()))?;
    Ok(bytes)
}

/// Hex-encoded random secret of `byte_len` bytes (`2 * byte_len` characters).
pub fn secret(byte_len: usize) -> Result<String, CredentialError> {
    Ok(hex::encode(random_bytes(byte_len)?))
}

/// Hex password of exactly `len` characters.
///
/// Draws `len` random bytes and keeps the first `len` hex digits.
pub fn password(len: usize) -> Result<String, CredentialError> {
    let mut encoded = secret(len)?;
    encoded.truncate(len);
    Ok(encoded)
}

/// Application encryption key: `base64:` followed by 32 random bytes.
pub fn encryption_key() -> Result<String, CredentialError> {
    let bytes = random_bytes(ENCRYPTION_KEY_BYTES)?;
    Ok(format!(
        "{}{}",
        ENCRYPTION_KEY_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_length_and_alphabet() {
        let s = secret(16).expect("secret");
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_password_lengths() {
        assert_eq!(password(DB_PASSWORD_LEN).expect("password").len(), 24);
        assert_eq!(password(API_KEY_LEN).expect("password").len(), 32);
    }

    #[test]
    fn test_calls_are_independent() {
        let a = password(DB_PASSWORD_LEN).expect("password");
        let b = password(DB_PASSWORD_LEN).expect("password");
        assert_ne!(a, b);
    }

    #[test]
    fn test_encryption_key_shape() {
        let key = encryption_key().expect("key");
        let encoded = key.strip_prefix(ENCRYPTION_KEY_PREFIX).expect("prefix");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .expect("valid base64");
        assert_eq!(decoded.len(), ENCRYPTION_KEY_BYTES);
    }
}
