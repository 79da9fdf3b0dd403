use crate::db::{DatabaseOptions, SSL_MODES};
use clap::{Arg, ArgMatches, Command, builder::PossibleValuesParser};
use secrecy::SecretString;
use std::time::Duration;

use super::validator_duration;

pub const ARG_DB_HOST: &str = "db-host";
pub const ARG_DB_PORT: &str = "db-port";
pub const ARG_DB_USER: &str = "db-user";
pub const ARG_DB_PASSWORD: &str = "db-password";
pub const ARG_DB_NAME: &str = "db-name";
pub const ARG_DB_SSLMODE: &str = "db-sslmode";
pub const ARG_DB_MAX_CONNECTIONS: &str = "db-max-connections";
pub const ARG_DB_MIN_CONNECTIONS: &str = "db-min-connections";
pub const ARG_DB_ACQUIRE_TIMEOUT: &str = "db-acquire-timeout";
pub const ARG_DB_MAX_LIFETIME: &str = "db-max-lifetime";
pub const ARG_DB_IDLE_TIMEOUT: &str = "db-idle-timeout";
pub const ARG_DB_CONNECT_RETRIES: &str = "db-connect-retries";
pub const ARG_DB_CONNECT_RETRY_INTERVAL: &str = "db-connect-retry-interval";

/// Parse database arguments from matches.
///
/// # Errors
/// Returns an error if a value is missing or the pool bounds are inconsistent.
pub fn parse(matches: &ArgMatches) -> anyhow::Result<DatabaseOptions> {
    let string = |id: &str| -> anyhow::Result<String> {
        matches
            .get_one::<String>(id)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
    };
    let duration = |id: &str| -> anyhow::Result<Duration> {
        matches
            .get_one::<Duration>(id)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
    };
    let count = |id: &str| -> anyhow::Result<u32> {
        matches
            .get_one::<u32>(id)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
    };

    let options = DatabaseOptions {
        host: string(ARG_DB_HOST)?,
        port: matches.get_one::<u16>(ARG_DB_PORT).copied().unwrap_or(5432),
        user: string(ARG_DB_USER)?,
        password: SecretString::from(
            matches
                .get_one::<String>(ARG_DB_PASSWORD)
                .cloned()
                .unwrap_or_default(),
        ),
        name: string(ARG_DB_NAME)?,
        sslmode: string(ARG_DB_SSLMODE)?,
        max_connections: count(ARG_DB_MAX_CONNECTIONS)?,
        min_connections: count(ARG_DB_MIN_CONNECTIONS)?,
        acquire_timeout: duration(ARG_DB_ACQUIRE_TIMEOUT)?,
        max_lifetime: duration(ARG_DB_MAX_LIFETIME)?,
        idle_timeout: duration(ARG_DB_IDLE_TIMEOUT)?,
        connect_retries: count(ARG_DB_CONNECT_RETRIES)?,
        connect_retry_interval: duration(ARG_DB_CONNECT_RETRY_INTERVAL)?,
    };

    if options.min_connections > options.max_connections {
        anyhow::bail!(
            "--{ARG_DB_MIN_CONNECTIONS} ({}) exceeds --{ARG_DB_MAX_CONNECTIONS} ({})",
            options.min_connections,
            options.max_connections
        );
    }

    Ok(options)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_connection_args(command);
    with_pool_args(command)
}

fn with_connection_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DB_HOST)
                .long(ARG_DB_HOST)
                .help("Database host")
                .env("WARDEN_DB_HOST")
                .default_value("localhost"),
        )
        .arg(
            Arg::new(ARG_DB_PORT)
                .long(ARG_DB_PORT)
                .help("Database port")
                .env("WARDEN_DB_PORT")
                .default_value("5432")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DB_USER)
                .long(ARG_DB_USER)
                .help("Database user")
                .env("WARDEN_DB_USER")
                .default_value("postgres"),
        )
        .arg(
            Arg::new(ARG_DB_PASSWORD)
                .long(ARG_DB_PASSWORD)
                .help("Database password")
                .env("WARDEN_DB_PASSWORD")
                .hide_env_values(true)
                .hide_default_value(true)
                .default_value("postgres"),
        )
        .arg(
            Arg::new(ARG_DB_NAME)
                .long(ARG_DB_NAME)
                .help("Database name")
                .env("WARDEN_DB_NAME")
                .default_value("warden"),
        )
        .arg(
            Arg::new(ARG_DB_SSLMODE)
                .long(ARG_DB_SSLMODE)
                .help("libpq sslmode")
                .env("WARDEN_DB_SSLMODE")
                .default_value("disable")
                .value_parser(PossibleValuesParser::new(SSL_MODES)),
        )
}

fn with_pool_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DB_MAX_CONNECTIONS)
                .long(ARG_DB_MAX_CONNECTIONS)
                .help("Maximum open connections in the pool")
                .env("WARDEN_DB_MAX_CONNECTIONS")
                .default_value("25")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_DB_MIN_CONNECTIONS)
                .long(ARG_DB_MIN_CONNECTIONS)
                .help("Idle connections kept in the pool")
                .env("WARDEN_DB_MIN_CONNECTIONS")
                .default_value("1")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_DB_ACQUIRE_TIMEOUT)
                .long(ARG_DB_ACQUIRE_TIMEOUT)
                .help("Wait for a free connection before answering 503")
                .env("WARDEN_DB_ACQUIRE_TIMEOUT")
                .default_value("5s")
                .value_parser(validator_duration()),
        )
        .arg(
            Arg::new(ARG_DB_MAX_LIFETIME)
                .long(ARG_DB_MAX_LIFETIME)
                .help("Maximum lifetime of a pooled connection")
                .env("WARDEN_DB_MAX_LIFETIME")
                .default_value("1800s")
                .value_parser(validator_duration()),
        )
        .arg(
            Arg::new(ARG_DB_IDLE_TIMEOUT)
                .long(ARG_DB_IDLE_TIMEOUT)
                .help("Close pooled connections idle for longer than this")
                .env("WARDEN_DB_IDLE_TIMEOUT")
                .default_value("1800s")
                .value_parser(validator_duration()),
        )
        .arg(
            Arg::new(ARG_DB_CONNECT_RETRIES)
                .long(ARG_DB_CONNECT_RETRIES)
                .help("Startup connection retries before giving up")
                .env("WARDEN_DB_CONNECT_RETRIES")
                .default_value("3")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_DB_CONNECT_RETRY_INTERVAL)
                .long(ARG_DB_CONNECT_RETRY_INTERVAL)
                .help("Delay between startup connection retries")
                .env("WARDEN_DB_CONNECT_RETRY_INTERVAL")
                .default_value("5s")
                .value_parser(validator_duration()),
        )
}
