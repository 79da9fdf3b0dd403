use crate::token::MIN_SECRET_KEY_SIZE;
use clap::{Arg, ArgMatches, Command};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_TOKEN_TTL_HOURS: &str = "token-ttl-hours";

#[derive(Debug, Clone)]
pub struct Options {
    pub secret: SecretString,
    pub ttl: Duration,
}

impl Options {
    /// Parse token arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret is missing or shorter than 32 characters.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let secret = match matches.get_one::<String>(ARG_TOKEN_SECRET) {
            Some(value) if !value.trim().is_empty() => SecretString::from(value.clone()),
            _ => anyhow::bail!("missing required argument: --{ARG_TOKEN_SECRET}"),
        };

        if secret.expose_secret().chars().count() < MIN_SECRET_KEY_SIZE {
            anyhow::bail!("--{ARG_TOKEN_SECRET} must be at least {MIN_SECRET_KEY_SIZE} characters");
        }

        let hours = matches
            .get_one::<u64>(ARG_TOKEN_TTL_HOURS)
            .copied()
            .unwrap_or(24);

        Ok(Self {
            secret,
            ttl: Duration::from_secs(hours * 60 * 60),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("HMAC secret used to sign bearer tokens (at least 32 characters)")
                .env("WARDEN_TOKEN_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_HOURS)
                .long(ARG_TOKEN_TTL_HOURS)
                .help("Lifetime of issued tokens in hours")
                .env("WARDEN_TOKEN_TTL_HOURS")
                .default_value("24")
                .value_parser(clap::value_parser!(u64).range(1..=8760)),
        )
}
