//! Short-lived cache of verified credentials.
//!
//! Keys are SHA-256 digests of `username:password`, so plaintext never sits in
//! memory past the request and a different password never hits an entry.
//! Entries expire after the configured TTL.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use super::Principal;

type CredentialDigest = [u8; 32];

#[derive(Debug)]
struct CachedIdentity {
    username: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct IdentityCache {
    ttl: Duration,
    entries: RwLock<HashMap<CredentialDigest, CachedIdentity>>,
}

fn credential_digest(username: &str, password: &SecretString) -> CredentialDigest {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(password.expose_secret().as_bytes());
    hasher.finalize().into()
}

impl IdentityCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn lookup(&self, username: &str, password: &SecretString) -> Option<Principal> {
        let key = credential_digest(username, password);
        let entries = self.entries.read().await;
        entries
            .get(&key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| Principal {
                username: entry.username.clone(),
            })
    }

    pub async fn remember(&self, username: &str, password: &SecretString) {
        let key = credential_digest(username, password);
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            CachedIdentity {
                username: username.to_string(),
                expires_at: now + self.ttl,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
