//! # Tripstore
//!
//! A small REST service where users register with a username and password
//! and then manage their own trips.
//!
//! ## Authentication
//!
//! Every trip route and `GET /user/` require HTTP Basic credentials, checked
//! against a bcrypt hash on each request. Any credential problem yields the
//! same `401` with a `WWW-Authenticate: Basic` challenge.
//!
//! ## Ownership
//!
//! Trips are stamped with their owner on creation, and every read, update and
//! delete is scoped to the caller. A trip owned by someone else is reported as
//! `404 Not Found`, exactly like an id that does not exist.
//!
//! ## Storage
//!
//! [`store::PgStore`] keeps users and records in PostgreSQL (records as
//! `JSONB`); [`store::MemoryStore`] is a volatile replacement used by tests and
//! `--in-memory`.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
