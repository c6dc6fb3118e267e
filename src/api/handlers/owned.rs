//! Ownership-scoped CRUD over a record collection.
//!
//! Flow Overview:
//! 1) The caller is already authenticated; its [`Principal`] becomes the
//!    owner predicate of a [`Scope`].
//! 2) Client-supplied `id`/`owner` keys are dropped; the server stamps owner.
//! 3) Reads, replaces and deletes only ever match inside that scope, so a
//!    foreign id behaves exactly like an unknown one.

use serde_json::{json, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{auth::Principal, ApiError};
use crate::store::{strip_reserved, Fields, Record, RecordStore, Scope};

const NOT_AN_OBJECT: &str = "Request body must be a JSON object";
const CONTAINS_NUL: &str = "Request body must not contain NUL characters";

/// A collection whose records belong to individual users. Any JSON object
/// is a valid record.
#[derive(Clone, Copy, Debug)]
pub struct OwnedCollection {
    pub name: &'static str,
}

impl OwnedCollection {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    fn scope<'a>(&'a self, principal: &'a Principal) -> Scope<'a> {
        Scope::new(self.name, &principal.username)
    }

    /// Every record the caller owns, oldest first.
    ///
    /// # Errors
    /// Returns [`ApiError::Internal`] if the store fails.
    #[instrument(skip_all, fields(collection = self.name, owner = %principal.username))]
    pub async fn list(
        &self,
        store: &dyn RecordStore,
        principal: &Principal,
    ) -> Result<Vec<Record>, ApiError> {
        Ok(store.list(self.scope(principal)).await?)
    }

    /// # Errors
    /// [`ApiError::NotFound`] when the id is malformed, unknown, or owned by
    /// someone else.
    #[instrument(skip_all, fields(collection = self.name, owner = %principal.username, id = %id))]
    pub async fn get(
        &self,
        store: &dyn RecordStore,
        principal: &Principal,
        id: &str,
    ) -> Result<Record, ApiError> {
        let id = parse_id(id)?;
        store
            .get(self.scope(principal), id)
            .await?
            .ok_or(ApiError::NotFound)
    }

    /// Insert a record owned by the caller and return it as stored.
    ///
    /// # Errors
    /// [`ApiError::Validation`] when the body is not an object or contains
    /// NUL characters.
    #[instrument(skip_all, fields(collection = self.name, owner = %principal.username))]
    pub async fn create(
        &self,
        store: &dyn RecordStore,
        principal: &Principal,
        body: Value,
    ) -> Result<Record, ApiError> {
        let Value::Object(fields) = body else {
            return Err(ApiError::Validation(NOT_AN_OBJECT));
        };
        check_nul(&fields)?;

        let scope = self.scope(principal);
        let id = store.insert(scope, strip_reserved(fields)).await?;
        debug!(%id, "Record created");

        // Read back through the same scope to return what the store holds.
        store
            .get(scope, id)
            .await?
            .ok_or_else(|| ApiError::Internal(format!("record {id} vanished after insert")))
    }

    /// Replace the caller's record fields; `id` and `owner` are immutable.
    ///
    /// # Errors
    /// [`ApiError::NotFound`] when nothing in scope matched.
    #[instrument(skip_all, fields(collection = self.name, owner = %principal.username, id = %id))]
    pub async fn update(
        &self,
        store: &dyn RecordStore,
        principal: &Principal,
        id: &str,
        body: Value,
    ) -> Result<Record, ApiError> {
        let Value::Object(fields) = body else {
            return Err(ApiError::Validation(NOT_AN_OBJECT));
        };
        check_nul(&fields)?;
        let id = parse_id(id)?;

        store
            .replace(self.scope(principal), id, strip_reserved(fields))
            .await?
            .ok_or(ApiError::NotFound)
    }

    /// Delete the caller's record. Always acknowledges the requested id.
    ///
    /// # Errors
    /// Returns [`ApiError::Internal`] if the store fails.
    #[instrument(skip_all, fields(collection = self.name, owner = %principal.username, id = %id))]
    pub async fn delete(
        &self,
        store: &dyn RecordStore,
        principal: &Principal,
        id: &str,
    ) -> Result<Value, ApiError> {
        if let Ok(parsed) = Uuid::parse_str(id.trim()) {
            let removed = store.delete(self.scope(principal), parsed).await?;
            debug!(removed, "Delete processed");
        }
        Ok(json!({ "id": id }))
    }
}

fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id.trim()).map_err(|_| ApiError::NotFound)
}

// JSONB cannot store U+0000 in keys or strings.
fn check_nul(fields: &Fields) -> Result<(), ApiError> {
    if map_contains_nul(fields) {
        return Err(ApiError::Validation(CONTAINS_NUL));
    }
    Ok(())
}

fn map_contains_nul(map: &Fields) -> bool {
    map.iter()
        .any(|(key, value)| key.contains('\0') || contains_nul(value))
}

fn contains_nul(value: &Value) -> bool {
    match value {
        Value::String(text) => text.contains('\0'),
        Value::Array(items) => items.iter().any(contains_nul),
        Value::Object(map) => map_contains_nul(map),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}
