//! Postgres-backed store: users in `users`, documents as `JSONB` in `records`.

use super::{CredentialStore, Fields, Record, RecordStore, Scope, StoreError, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    types::Json,
    Connection, PgPool, Row,
};
use std::time::Duration;
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a pool and make sure the schema exists.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable or the schema fails to apply.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        let store = Self::from_pool(pool);
        store.apply_schema().await?;

        Ok(store)
    }

    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run every statement in `sql/schema.sql`.
    ///
    /// # Errors
    /// Returns an error naming the statement that failed.
    pub async fn apply_schema(&self) -> Result<()> {
        for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }

        Ok(())
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn record_from_row(row: &PgRow) -> Result<Record, StoreError> {
    let id: Uuid = row.try_get("id")?;
    let owner: String = row.try_get("owner")?;
    let Json(body): Json<serde_json::Value> = row.try_get("body")?;
    match body {
        serde_json::Value::Object(fields) => Ok(Record { id, owner, fields }),
        _ => Err(StoreError::Corrupt(id)),
    }
}

/// Split a schema file on statement-terminating `;`, skipping comments.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let query = "SELECT username, password_hash FROM users WHERE username = $1";
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        row.map(|row| -> Result<User, StoreError> {
            Ok(User {
                username: row.try_get("username")?,
                password_hash: row.try_get("password_hash")?,
            })
        })
        .transpose()
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (username) DO NOTHING
        ";
        let result = sqlx::query(query)
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(username.to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn list(&self, scope: Scope<'_>) -> Result<Vec<Record>, StoreError> {
        let query = r"
            SELECT id, owner, body
            FROM records
            WHERE collection = $1 AND owner = $2
            ORDER BY seq
        ";
        let rows = sqlx::query(query)
            .bind(scope.collection)
            .bind(scope.owner)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn get(&self, scope: Scope<'_>, id: Uuid) -> Result<Option<Record>, StoreError> {
        let query = r"
            SELECT id, owner, body
            FROM records
            WHERE collection = $1 AND owner = $2 AND id = $3
        ";
        let row = sqlx::query(query)
            .bind(scope.collection)
            .bind(scope.owner)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn insert(&self, scope: Scope<'_>, fields: Fields) -> Result<Uuid, StoreError> {
        let query = r"
            INSERT INTO records (id, collection, owner, body)
            VALUES ($1, $2, $3, $4)
        ";
        let id = Uuid::now_v7();
        sqlx::query(query)
            .bind(id)
            .bind(scope.collection)
            .bind(scope.owner)
            .bind(Json(fields))
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;

        Ok(id)
    }

    async fn replace(
        &self,
        scope: Scope<'_>,
        id: Uuid,
        fields: Fields,
    ) -> Result<Option<Record>, StoreError> {
        let query = r"
            UPDATE records
            SET body = $4, updated_at = NOW()
            WHERE collection = $1 AND owner = $2 AND id = $3
            RETURNING id, owner, body
        ";
        let row = sqlx::query(query)
            .bind(scope.collection)
            .bind(scope.owner)
            .bind(id)
            .bind(Json(fields))
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn delete(&self, scope: Scope<'_>, id: Uuid) -> Result<bool, StoreError> {
        let query = "DELETE FROM records WHERE collection = $1 AND owner = $2 AND id = $3";
        let result = sqlx::query(query)
            .bind(scope.collection)
            .bind(scope.owner)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}
