//! bcrypt password hashing.
//!
//! The salt and cost are embedded in the hash string, so verification only
//! needs the stored value. Work runs on the blocking pool.

use secrecy::{ExposeSecret, SecretString};
use tracing::error;

pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;
/// bcrypt only reads this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("bcrypt cost must be between {MIN_COST} and {MAX_COST}, got {0}")]
    InvalidCost(u32),
    #[error("password exceeds {MAX_PASSWORD_BYTES} bytes")]
    TooLong,
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    /// # Errors
    /// Returns [`PasswordError::InvalidCost`] outside `MIN_COST..=MAX_COST`.
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(PasswordError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Produce a salted, self-describing hash of `plaintext`.
    ///
    /// # Errors
    /// [`PasswordError::TooLong`] past [`MAX_PASSWORD_BYTES`], otherwise an
    /// error if bcrypt fails or the blocking task panics.
    pub async fn hash(&self, plaintext: &SecretString) -> Result<String, PasswordError> {
        if plaintext.expose_secret().len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong);
        }
        let password = SecretString::from(plaintext.expose_secret().to_owned());
        let cost = self.cost;
        let hash =
            tokio::task::spawn_blocking(move || bcrypt::hash(password.expose_secret(), cost))
                .await??;
        Ok(hash)
    }

    /// Check `plaintext` against `stored_hash` with the salt and cost it carries.
    ///
    /// A malformed stored hash never verifies, and neither does a plaintext
    /// longer than [`MAX_PASSWORD_BYTES`]: bcrypt would compare only its prefix.
    pub async fn verify(&self, plaintext: &SecretString, stored_hash: &str) -> bool {
        if plaintext.expose_secret().len() > MAX_PASSWORD_BYTES {
            return false;
        }
        let password = SecretString::from(plaintext.expose_secret().to_owned());
        let stored_hash = stored_hash.to_owned();
        match tokio::task::spawn_blocking(move || {
            bcrypt::verify(password.expose_secret(), &stored_hash)
        })
        .await
        {
            Ok(Ok(valid)) => valid,
            Ok(Err(err)) => {
                error!("Stored password hash is unusable: {err}");
                false
            }
            Err(err) => {
                error!("Password verification task failed: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn cost_outside_range_is_rejected() {
        assert!(matches!(
            PasswordHasher::new(3),
            Err(PasswordError::InvalidCost(3))
        ));
        assert!(matches!(
            PasswordHasher::new(32),
            Err(PasswordError::InvalidCost(32))
        ));
        assert_eq!(PasswordHasher::new(4).map(|h| h.cost()).ok(), Some(4));
        assert_eq!(PasswordHasher::default().cost(), 12);
    }

    #[tokio::test]
    async fn verify_accepts_original_password() -> Result<(), PasswordError> {
        for cost in [4, 5] {
            let hasher = PasswordHasher::new(cost)?;
            for plaintext in ["pw1", "", "correct horse battery staple", "pässwörd"] {
                let hash = hasher.hash(&secret(plaintext)).await?;
                assert!(hasher.verify(&secret(plaintext), &hash).await);
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() -> Result<(), PasswordError> {
        let hasher = PasswordHasher::new(4)?;
        let hash = hasher.hash(&secret("pw1")).await?;
        assert!(!hasher.verify(&secret("pw2"), &hash).await);
        assert!(!hasher.verify(&secret("PW1"), &hash).await);
        Ok(())
    }

    #[tokio::test]
    async fn long_passwords_are_not_compared_by_prefix() -> Result<(), PasswordError> {
        let hasher = PasswordHasher::new(4)?;
        let prefix = "x".repeat(MAX_PASSWORD_BYTES);

        let at_limit = hasher.hash(&secret(&prefix)).await?;
        assert!(hasher.verify(&secret(&prefix), &at_limit).await);
        assert!(!hasher.verify(&secret(&format!("{prefix}WRONG")), &at_limit).await);

        assert!(matches!(
            hasher.hash(&secret(&format!("{prefix}right"))).await,
            Err(PasswordError::TooLong)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn hashes_are_salted_and_never_plaintext() -> Result<(), PasswordError> {
        let hasher = PasswordHasher::new(4)?;
        let first = hasher.hash(&secret("same")).await?;
        let second = hasher.hash(&secret("same")).await?;
        assert_ne!(first, second);
        assert!(!first.contains("same"));
        assert!(first.starts_with("$2b$04$"));
        Ok(())
    }

    #[tokio::test]
    async fn verify_uses_cost_embedded_in_hash() -> Result<(), PasswordError> {
        let hash = PasswordHasher::new(4)?.hash(&secret("pw")).await?;
        let hasher = PasswordHasher::new(10)?;
        assert!(hasher.verify(&secret("pw"), &hash).await);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_hash_does_not_verify() {
        let hasher = PasswordHasher::default();
        assert!(!hasher.verify(&secret("pw"), "not-a-bcrypt-hash").await);
        assert!(!hasher.verify(&secret("pw"), "pw").await);
    }
}
