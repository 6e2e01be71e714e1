//! One-way password digests.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::task;

use crate::config::SecurityConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    /// Salted Argon2id PHC string.
    #[default]
    Argon2id,

    /// Unsalted lowercase hex SHA-256, as written by the legacy API.
    Sha256,
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid Argon2 params: {0}")]
    Params(String),

    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Password hashing task panicked: {0}")]
    Task(String),
}

/// Hashes `password` with the scheme and cost parameters from `config`.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String, PasswordError> {
    match config.password_scheme {
        PasswordScheme::Sha256 => Ok(sha256_hex(password)),
        PasswordScheme::Argon2id => {
            let params = Params::new(
                config.argon2_memory_cost_kib,
                config.argon2_time_cost,
                config.argon2_parallelism,
                None,
            )
            .map_err(|e| PasswordError::Params(e.to_string()))?;

            let salt = SaltString::generate(&mut OsRng);
            let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| PasswordError::Hash(e.to_string()))?;

            Ok(hash.to_string())
        }
    }
}

/// Runs [`hash_password`] on the blocking pool; Argon2 is CPU-bound.
pub async fn hash_password_blocking(
    password: String,
    config: SecurityConfig,
) -> Result<String, PasswordError> {
    task::spawn_blocking(move || hash_password(&password, &config))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))?
}

/// Checks `password` against either digest format.
#[must_use]
pub fn verify_password(password: &str, digest: &str) -> bool {
    if digest.starts_with("$argon2") {
        return PasswordHash::new(digest).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        });
    }

    sha256_hex(password).eq_ignore_ascii_case(digest)
}

#[must_use]
pub fn sha256_hex(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_argon2() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn argon2_digest_is_salted_and_verifies() {
        let config = cheap_argon2();
        let first = hash_password("admin123", &config).unwrap();
        let second = hash_password("admin123", &config).unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(verify_password("admin123", &first));
        assert!(verify_password("admin123", &second));
        assert!(!verify_password("admin124", &first));
    }

    #[test]
    fn sha256_matches_legacy_digest() {
        let config = SecurityConfig {
            password_scheme: PasswordScheme::Sha256,
            ..SecurityConfig::default()
        };
        let digest = hash_password("admin123", &config).unwrap();

        assert_eq!(
            digest,
            "240be518fabd2724ddb6f04eeb1da5967448d7e831c08c8fa822809f74c720a9"
        );
        assert!(verify_password("admin123", &digest));
        assert!(verify_password("admin123", &digest.to_uppercase()));
        assert!(!verify_password("admin", &digest));
    }

    #[test]
    fn rejects_invalid_params() {
        let config = SecurityConfig {
            argon2_time_cost: 0,
            ..SecurityConfig::default()
        };
        assert!(matches!(
            hash_password("x", &config),
            Err(PasswordError::Params(_))
        ));
    }

    #[test]
    fn malformed_phc_string_never_verifies() {
        assert!(!verify_password("admin123", "$argon2id$garbage"));
    }

    #[tokio::test]
    async fn blocking_variant_hashes() {
        let digest = hash_password_blocking("secret".to_string(), cheap_argon2())
            .await
            .unwrap();
        assert!(verify_password("secret", &digest));
    }
}
