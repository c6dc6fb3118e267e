//! Volatile store backed by process memory.
//!
//! Each collection of state sits behind its own `RwLock`; uniqueness checks
//! and inserts happen under the same write guard.

use super::{CredentialStore, Fields, Record, RecordStore, Scope, StoreError, User};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug)]
struct StoredRecord {
    collection: String,
    record: Record,
}

impl StoredRecord {
    fn matches(&self, scope: Scope<'_>) -> bool {
        self.collection == scope.collection && self.record.owner == scope.owner
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    // Vec keeps insertion order for listings.
    records: RwLock<Vec<StoredRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered users.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(StoreError::AlreadyExists(username.to_string()));
        }
        users.insert(
            username.to_string(),
            User {
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, scope: Scope<'_>) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|stored| stored.matches(scope))
            .map(|stored| stored.record.clone())
            .collect())
    }

    async fn get(&self, scope: Scope<'_>, id: Uuid) -> Result<Option<Record>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|stored| stored.record.id == id && stored.matches(scope))
            .map(|stored| stored.record.clone()))
    }

    async fn insert(&self, scope: Scope<'_>, fields: Fields) -> Result<Uuid, StoreError> {
        let id = Uuid::now_v7();
        self.records.write().await.push(StoredRecord {
            collection: scope.collection.to_string(),
            record: Record {
                id,
                owner: scope.owner.to_string(),
                fields,
            },
        });
        Ok(id)
    }

    async fn replace(
        &self,
        scope: Scope<'_>,
        id: Uuid,
        fields: Fields,
    ) -> Result<Option<Record>, StoreError> {
        let mut records = self.records.write().await;
        Ok(records
            .iter_mut()
            .find(|stored| stored.record.id == id && stored.matches(scope))
            .map(|stored| {
                stored.record.fields = fields;
                stored.record.clone()
            }))
    }

    async fn delete(&self, scope: Scope<'_>, id: Uuid) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|stored| !(stored.record.id == id && stored.matches(scope)));
        Ok(records.len() < before)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
