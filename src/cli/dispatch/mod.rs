//! Maps validated CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, store};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let backend = store::Backend::parse(matches)?;
    let auth_opts = auth::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        backend,
        bcrypt_cost: auth_opts.bcrypt_cost,
        auth_cache_ttl: auth_opts.cache_ttl,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("TRIPSTORE_PORT", Some("8443")),
                ("TRIPSTORE_DSN", Some("postgres://localhost:5432/tripstore")),
                ("TRIPSTORE_IN_MEMORY", None),
                ("TRIPSTORE_MAX_CONNECTIONS", None),
                ("TRIPSTORE_BCRYPT_COST", Some("6")),
                ("TRIPSTORE_AUTH_CACHE_TTL_SECONDS", Some("15")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["tripstore"]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 8443);
                    assert_eq!(
                        args.backend,
                        store::Backend::Postgres {
                            dsn: "postgres://localhost:5432/tripstore".to_string(),
                            max_connections: 5,
                        }
                    );
                    assert_eq!(args.bcrypt_cost, 6);
                    assert_eq!(args.auth_cache_ttl, Duration::from_secs(15));
                }
            },
        );
    }

    #[test]
    fn empty_dsn_is_rejected() {
        temp_env::with_vars(
            [
                ("TRIPSTORE_DSN", Some(" ")),
                ("TRIPSTORE_IN_MEMORY", None::<&str>),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["tripstore"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err
                        .to_string()
                        .contains("missing required argument: --dsn"));
                }
            },
        );
    }
}
