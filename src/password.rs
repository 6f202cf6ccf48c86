use argon2::{Config, Variant, Version};
use rand::RngCore;

use crate::{error::AuthError, types::HashedPassword};

const SALT_LEN: usize = 16;

/// Argon2id cost parameters.
///
/// The default (19 MiB, 2 passes, 1 lane) is the OWASP baseline for argon2id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    /// Memory in KiB.
    pub mem_cost: u32,
    pub time_cost: u32,
    pub lanes: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            mem_cost: 19 * 1024,
            time_cost: 2,
            lanes: 1,
        }
    }
}

/// One-way password hashing. Every hash gets its own random salt, and the
/// parameters are encoded into the stored string, so verification keeps
/// working if the cost is raised later.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher {
    cost: HashingCost,
}

impl PasswordHasher {
    pub fn new(cost: HashingCost) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<HashedPassword, AuthError> {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let config = Config {
            variant: Variant::Argon2id,
            version: Version::Version13,
            mem_cost: self.cost.mem_cost,
            time_cost: self.cost.time_cost,
            lanes: self.cost.lanes,
            ..Default::default()
        };

        let encoded = argon2::hash_encoded(password.as_bytes(), &salt, &config)
            .map_err(|e| AuthError::Hashing { source: e.into() })?;

        Ok(HashedPassword(encoded))
    }

    pub fn verify(&self, password: &str, hash: &HashedPassword) -> Result<bool, AuthError> {
        argon2::verify_encoded(&hash.0, password.as_bytes())
            .map_err(|e| AuthError::Hashing { source: e.into() })
    }

    /// [`PasswordHasher::hash`] on the blocking pool, keeping argon2 off the async workers.
    pub async fn hash_blocking(&self, password: String) -> Result<HashedPassword, AuthError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Hashing { source: e.into() })?
    }

    pub async fn verify_blocking(
        &self,
        password: String,
        hash: HashedPassword,
    ) -> Result<bool, AuthError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing { source: e.into() })?
    }
}
