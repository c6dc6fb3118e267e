//! Persistence seams for user credentials and owned records.
//!
//! Flow Overview:
//! 1) `CredentialStore` maps a username to its bcrypt hash.
//! 2) `RecordStore` keeps JSON documents grouped into collections.
//! 3) Every record operation takes a [`Scope`], so a query cannot be issued
//!    without the owner predicate.
//!
//! Two implementations exist: [`PgStore`] (`JSONB` documents in Postgres) and
//! [`MemoryStore`] (volatile, used by tests and `--in-memory`).

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Client-supplied document fields, without `id` and `owner`.
pub type Fields = Map<String, Value>;

/// Field names the server owns on every record.
pub const RESERVED_FIELDS: [&str; 2] = ["id", "owner"];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user already exists: {0}")]
    AlreadyExists(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored document for record {0} is not a JSON object")]
    Corrupt(Uuid),
}

/// A registered account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password_hash: String,
}

/// A stored document bound to its owner.
///
/// Serializes flat: `{"id": .., "owner": .., ...fields}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    pub id: Uuid,
    pub owner: String,
    #[serde(flatten)]
    pub fields: Fields,
}

/// Collection plus owner predicate conjoined with every record query.
#[derive(Clone, Copy, Debug)]
pub struct Scope<'a> {
    pub collection: &'a str,
    pub owner: &'a str,
}

impl<'a> Scope<'a> {
    #[must_use]
    pub const fn new(collection: &'a str, owner: &'a str) -> Self {
        Self { collection, owner }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by username.
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Insert a user unless the username is taken.
    ///
    /// The existence check and the insert are a single operation.
    ///
    /// # Errors
    /// Returns [`StoreError::AlreadyExists`] when the username is present.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records in scope, in insertion order.
    async fn list(&self, scope: Scope<'_>) -> Result<Vec<Record>, StoreError>;

    async fn get(&self, scope: Scope<'_>, id: Uuid) -> Result<Option<Record>, StoreError>;

    /// Insert a new record owned by `scope.owner` and return its assigned id.
    async fn insert(&self, scope: Scope<'_>, fields: Fields) -> Result<Uuid, StoreError>;

    /// Replace the fields of the record matching `id` within scope.
    ///
    /// Returns the record as written, or `None` when nothing matched.
    async fn replace(
        &self,
        scope: Scope<'_>,
        id: Uuid,
        fields: Fields,
    ) -> Result<Option<Record>, StoreError>;

    /// Delete the record matching `id` within scope; `true` if a row went away.
    async fn delete(&self, scope: Scope<'_>, id: Uuid) -> Result<bool, StoreError>;

    /// Cheap liveness probe used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Drop server-owned keys from client input.
#[must_use]
pub fn strip_reserved(mut fields: Fields) -> Fields {
    for key in RESERVED_FIELDS {
        fields.remove(key);
    }
    fields
}
