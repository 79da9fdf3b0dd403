use crate::api::ServerConfig;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::time::Duration;

use super::validator_duration;

pub const ARG_PORT: &str = "port";
pub const ARG_SHUTDOWN_TIMEOUT: &str = "shutdown-timeout";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";

/// Parse HTTP server arguments from matches.
#[must_use]
pub fn parse(matches: &ArgMatches) -> ServerConfig {
    let defaults = ServerConfig::default();

    ServerConfig {
        port: matches
            .get_one::<u16>(ARG_PORT)
            .copied()
            .unwrap_or(defaults.port),
        shutdown_timeout: matches
            .get_one::<Duration>(ARG_SHUTDOWN_TIMEOUT)
            .copied()
            .unwrap_or(defaults.shutdown_timeout),
        request_timeout: matches
            .get_one::<Duration>(ARG_REQUEST_TIMEOUT)
            .copied()
            .unwrap_or(defaults.request_timeout),
        cors_origins: matches
            .get_many::<String>(ARG_CORS_ORIGIN)
            .map(|origins| {
                origins
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("WARDEN_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SHUTDOWN_TIMEOUT)
                .long(ARG_SHUTDOWN_TIMEOUT)
                .help("Grace period for in-flight requests on shutdown, e.g. 5s")
                .env("WARDEN_SHUTDOWN_TIMEOUT")
                .default_value("5s")
                .value_parser(validator_duration()),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long(ARG_REQUEST_TIMEOUT)
                .help("Per-request timeout, answered with 408, e.g. 30s")
                .env("WARDEN_REQUEST_TIMEOUT")
                .default_value("30s")
                .value_parser(validator_duration()),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Allowed CORS origin, repeat or comma separate for several (default: any)")
                .env("WARDEN_CORS_ORIGIN")
                .action(ArgAction::Append)
                .value_delimiter(','),
        )
}
