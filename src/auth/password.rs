use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::error;

use crate::config::PasswordConfig;

/// Salted Argon2id hashing of user passwords.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
    // Hash of a throwaway password with the same params, verified against
    // when there is no real hash so both paths cost the same.
    dummy: Arc<str>,
}

impl CredentialHasher {
    pub fn new(memory_kib: u32, cost: u32) -> anyhow::Result<Self> {
        let params = Params::new(memory_kib, cost, Params::DEFAULT_P_COST, None).map_err(|e| {
            error!(error = %e, memory_kib, cost, "invalid argon2 params");
            anyhow::anyhow!(e.to_string())
        })?;
        let mut hasher = Self {
            params,
            dummy: Arc::from(""),
        };
        hasher.dummy = Arc::from(hasher.hash("dummy-password-for-timing")?);
        Ok(hasher)
    }

    pub fn from_config(cfg: &PasswordConfig) -> anyhow::Result<Self> {
        Self::new(cfg.memory_kib, cfg.hash_cost)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Run a full verification against the dummy hash. Always `false`.
    pub fn verify_dummy(&self, plain: &str) -> anyhow::Result<bool> {
        self.verify(plain, &self.dummy).map(|_| false)
    }

    /// `Ok(false)` on mismatch. A stored hash that cannot be parsed is an error,
    /// not a mismatch.
    pub fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        match self.argon2().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(anyhow::anyhow!(e.to_string()))
            }
        }
    }
}
