//! Credential verification shared by every authenticated route.
//!
//! Flow Overview:
//! 1) `principal` decodes HTTP Basic credentials from the request.
//! 2) `AuthGate::verify` looks the username up and checks the bcrypt hash.
//! 3) Successful checks may be cached for a short TTL (`cache`).
//!
//! Nothing is persisted between requests; each one is re-authenticated.

pub mod cache;
pub mod password;
pub mod principal;

pub use cache::IdentityCache;
pub use password::{PasswordError, PasswordHasher};
pub use principal::{require_auth, BasicCredentials, Principal};

use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tokio::sync::OnceCell;
use tracing::{error, instrument};

use crate::store::{CredentialStore, StoreError};

// Hashed on first use; compared against when the username is unknown so that
// lookups for missing users cost one bcrypt verification as well.
const DECOY_PASSWORD: &str = "tripstore-decoy-password";

pub struct AuthGate {
    credentials: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    cache: Option<IdentityCache>,
    decoy_hash: OnceCell<String>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("hasher", &self.hasher)
            .field("cache_ttl", &self.cache.as_ref().map(IdentityCache::ttl))
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>, hasher: PasswordHasher) -> Self {
        Self {
            credentials,
            hasher,
            cache: None,
            decoy_hash: OnceCell::new(),
        }
    }

    /// Cache verified credentials for `ttl`; a zero TTL disables caching.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = (!ttl.is_zero()).then(|| IdentityCache::new(ttl));
        self
    }

    #[must_use]
    pub const fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    #[must_use]
    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    #[must_use]
    pub const fn cache(&self) -> Option<&IdentityCache> {
        self.cache.as_ref()
    }

    /// Check credentials against the credential store.
    ///
    /// `Ok(None)` covers both an unknown username and a wrong password.
    ///
    /// # Errors
    /// Returns an error only when the credential store itself fails.
    #[instrument(skip_all, fields(username = %credentials.username))]
    pub async fn verify(
        &self,
        credentials: &BasicCredentials,
    ) -> Result<Option<Principal>, StoreError> {
        if let Some(cache) = &self.cache {
            if let Some(principal) = cache
                .lookup(&credentials.username, &credentials.password)
                .await
            {
                return Ok(Some(principal));
            }
        }

        let Some(user) = self.credentials.find_user(&credentials.username).await? else {
            self.burn_decoy(&credentials.password).await;
            return Ok(None);
        };

        if !self
            .hasher
            .verify(&credentials.password, &user.password_hash)
            .await
        {
            return Ok(None);
        }

        if let Some(cache) = &self.cache {
            cache
                .remember(&credentials.username, &credentials.password)
                .await;
        }

        Ok(Some(Principal {
            username: user.username,
        }))
    }

    async fn burn_decoy(&self, password: &SecretString) {
        let hasher = self.hasher;
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| async move {
                let decoy = SecretString::from(DECOY_PASSWORD.to_string());
                hasher.hash(&decoy).await
            })
            .await;

        match decoy {
            Ok(hash) => {
                let _ = self.hasher.verify(password, hash).await;
            }
            Err(err) => error!("Failed to prepare decoy hash: {err}"),
        }
    }
}
