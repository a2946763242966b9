//! Argon2id password hashing

use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;

use duet_common::{Error, Result};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

use crate::config::AuthConfig;

/// One-way, salted, cost-tunable password verifier.
///
/// Produces PHC strings, so the parameters used at hash time travel with
/// the hash and older hashes still verify after a cost change.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
    /// Hash of a random secret at the configured cost, checked in place of a
    /// missing account so unknown emails cost as much as wrong passwords
    decoy: Arc<str>,
}

impl PasswordHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| Error::Internal(format!("invalid argon2 parameters: {e}")))?;
        let mut hasher = Self {
            params,
            decoy: Arc::from(""),
        };

        let secret: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        hasher.decoy = Arc::from(hasher.hash(&secret)?);
        Ok(hasher)
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        Self::new(config.password_memory_kib, config.password_iterations)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("password hash failed: {e}")))?
            .to_string();
        Ok(hash)
    }

    /// False for a wrong password and for an unparseable stored hash
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            tracing::warn!("Stored password hash is not a valid PHC string");
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Verify against `stored_hash`, or against the decoy when there is no
    /// account. Always false in the latter case.
    pub fn verify_or_decoy(&self, password: &str, stored_hash: Option<&str>) -> bool {
        match stored_hash {
            Some(hash) => self.verify(password, hash),
            None => {
                let _ = self.verify(password, &self.decoy);
                false
            }
        }
    }
}
