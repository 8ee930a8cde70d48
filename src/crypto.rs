//! Password hashing logics.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

type Result<T> = std::result::Result<T, CryptoError>;

/// Plaintext hashed at start-up. Used to keep failed lookups as slow as
/// failed verifications.
const DUMMY_PASSWORD: &str = "devroom-dummy-password";

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
    #[error("password does not match")]
    Mismatch,
}

/// Argon2id password manager.
pub struct PasswordManager {
    params: Params,
    dummy_hash: String,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        let mut manager = Self {
            params,
            dummy_hash: String::default(),
        };
        manager.dummy_hash = manager.hash_password(DUMMY_PASSWORD)?;

        Ok(manager)
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    ///
    /// Returns a PHC string embedding algorithm, parameters and salt.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        Ok(self
            .argon2()
            .hash_password(password.as_ref(), &salt)
            .map_err(|err| CryptoError::Argon2(err.to_string()))?
            .to_string())
    }

    /// Check `password` against a stored PHC string.
    pub fn verify_password(&self, password: impl AsRef<[u8]>, hash: &str) -> Result<()> {
        let parsed = PasswordHash::new(hash).map_err(|err| CryptoError::Argon2(err.to_string()))?;

        self.argon2()
            .verify_password(password.as_ref(), &parsed)
            .map_err(|_| CryptoError::Mismatch)
    }

    /// Burn a verification against the dummy hash. Always fails.
    pub fn verify_dummy(&self, password: impl AsRef<[u8]>) {
        let _ = self.verify_password(password, &self.dummy_hash);
    }
}
