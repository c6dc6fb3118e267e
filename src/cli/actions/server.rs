use crate::{
    api::{
        self,
        handlers::auth::{AuthGate, PasswordHasher},
    },
    cli::commands::store::Backend,
    store::{CredentialStore, MemoryStore, PgStore, RecordStore},
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub backend: Backend,
    pub bcrypt_cost: u32,
    pub auth_cache_ttl: Duration,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be opened or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let (credentials, records): (Arc<dyn CredentialStore>, Arc<dyn RecordStore>) =
        match &args.backend {
            Backend::Postgres {
                dsn,
                max_connections,
            } => {
                info!(
                    dsn = %redact_dsn(dsn),
                    max_connections, "Connecting to PostgreSQL"
                );
                let store = Arc::new(PgStore::connect(dsn, *max_connections).await?);
                (store.clone(), store)
            }
            Backend::Memory => {
                warn!("Using the in-memory store; data is lost on exit");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    let hasher = PasswordHasher::new(args.bcrypt_cost).context("Invalid bcrypt cost")?;
    let gate = Arc::new(AuthGate::new(credentials, hasher).with_cache_ttl(args.auth_cache_ttl));

    api::new(args.port, gate, records).await
}

/// Strip the password from a DSN before logging it.
fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("****")).is_err() {
                return "<redacted>".to_string();
            }
            url.to_string()
        }
        Err(_) => "<unparseable dsn>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_dsn_hides_password() {
        assert_eq!(
            redact_dsn("postgres://alice:hunter2@db:5432/tripstore"),
            "postgres://alice:****@db:5432/tripstore"
        );
        assert_eq!(
            redact_dsn("postgres://db:5432/tripstore"),
            "postgres://db:5432/tripstore"
        );
        assert_eq!(redact_dsn("not a url"), "<unparseable dsn>");
    }
}
