use crate::admission::RateLimitConfig;
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

use super::validator_duration;

pub const ARG_RATE_LIMIT_REQUESTS: &str = "rate-limit-requests";
pub const ARG_RATE_LIMIT_WINDOW: &str = "rate-limit-window";

const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Parse rate limiter arguments from matches.
///
/// # Errors
/// Returns an error if the window is shorter than one second or longer than a day.
pub fn parse(matches: &ArgMatches) -> anyhow::Result<RateLimitConfig> {
    let defaults = RateLimitConfig::default();

    let limit = matches
        .get_one::<u64>(ARG_RATE_LIMIT_REQUESTS)
        .map(|limit| usize::try_from(*limit))
        .transpose()?
        .unwrap_or(defaults.limit);

    let window = matches
        .get_one::<Duration>(ARG_RATE_LIMIT_WINDOW)
        .copied()
        .unwrap_or(defaults.window);

    if window < Duration::from_secs(1) {
        anyhow::bail!("--{ARG_RATE_LIMIT_WINDOW} must be at least 1s");
    }

    if window > MAX_WINDOW {
        anyhow::bail!("--{ARG_RATE_LIMIT_WINDOW} must be at most 24h");
    }

    Ok(RateLimitConfig { limit, window })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RATE_LIMIT_REQUESTS)
                .long(ARG_RATE_LIMIT_REQUESTS)
                .help("Requests allowed per client IP within the window")
                .env("WARDEN_RATE_LIMIT_REQUESTS")
                .default_value("100")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_WINDOW)
                .long(ARG_RATE_LIMIT_WINDOW)
                .help("Sliding window length, e.g. 60s or 1m")
                .env("WARDEN_RATE_LIMIT_WINDOW")
                .default_value("60s")
                .value_parser(validator_duration()),
        )
}
