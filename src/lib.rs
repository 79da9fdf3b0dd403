//! # Warden
//!
//! `warden` is a small user accounts service: registration, login and user
//! management over a JSON HTTP API backed by `PostgreSQL`.
//!
//! ## Authentication
//!
//! Login exchanges an email and password for a signed bearer token (HS256 JWT
//! carrying the user id, issue time and expiry). Passwords are stored as
//! Argon2id hashes and never leave the process. Every `/api/v1/users` route
//! requires `Authorization: Bearer <token>`.
//!
//! ## Admission
//!
//! All `/api/v1` routes are rate limited per client IP with a sliding window
//! (default 100 requests per 60 seconds). Rejected requests get `429` with a
//! `Retry-After` header and do not consume quota.
//!
//! ## Errors
//!
//! Failures are answered with `{"code", "message", "details"?}`. Internal
//! errors are logged with full context and reported to the client generically.

pub mod admission;
pub mod api;
pub mod cli;
pub mod db;
pub mod token;
pub mod user;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
