use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

use crate::api::handlers::auth::password::{DEFAULT_COST, MAX_COST, MIN_COST};

pub const ARG_BCRYPT_COST: &str = "bcrypt-cost";
pub const ARG_AUTH_CACHE_TTL_SECONDS: &str = "auth-cache-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub bcrypt_cost: u32,
    pub cache_ttl: Duration,
}

impl Options {
    /// Parse password hashing and credential cache arguments.
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            bcrypt_cost: matches
                .get_one::<u32>(ARG_BCRYPT_COST)
                .copied()
                .unwrap_or(DEFAULT_COST),
            cache_ttl: Duration::from_secs(
                matches
                    .get_one::<u64>(ARG_AUTH_CACHE_TTL_SECONDS)
                    .copied()
                    .unwrap_or(0),
            ),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BCRYPT_COST)
                .long(ARG_BCRYPT_COST)
                .help("bcrypt work factor for new password hashes")
                .env("TRIPSTORE_BCRYPT_COST")
                .default_value("12")
                .value_parser(clap::value_parser!(u32).range(i64::from(MIN_COST)..=i64::from(MAX_COST))),
        )
        .arg(
            Arg::new(ARG_AUTH_CACHE_TTL_SECONDS)
                .long(ARG_AUTH_CACHE_TTL_SECONDS)
                .help("Cache verified credentials for this many seconds (0 disables)")
                .env("TRIPSTORE_AUTH_CACHE_TTL_SECONDS")
                .default_value("0")
                .value_parser(clap::value_parser!(u64)),
        )
}
