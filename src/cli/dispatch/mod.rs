//! Map validated CLI arguments to an [`Action`].

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{database, rate_limit, server, token};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let token_opts = token::Options::parse(matches)?;

    Ok(Action::Server(Args {
        server: server::parse(matches),
        token_secret: token_opts.secret,
        token_ttl: token_opts.ttl,
        database: database::parse(matches)?,
        rate_limit: rate_limit::parse(matches)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::time::Duration;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn dispatch(args: &[&str]) -> Result<Action> {
        let matches = crate::cli::commands::new().get_matches_from(args);
        handler(&matches)
    }

    fn error_message(result: Result<Action>) -> String {
        match result {
            Ok(action) => panic!("expected error, got {action:?}"),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn token_secret_required() {
        temp_env::with_vars_unset(["WARDEN_TOKEN_SECRET"], || {
            assert!(
                error_message(dispatch(&["warden"]))
                    .contains("missing required argument: --token-secret")
            );
        });
    }

    #[test]
    fn token_secret_too_short() {
        temp_env::with_vars_unset(["WARDEN_TOKEN_SECRET"], || {
            assert!(
                error_message(dispatch(&["warden", "--token-secret", "short"]))
                    .contains("at least 32 characters")
            );
        });
    }

    #[test]
    fn pool_bounds_checked() {
        temp_env::with_vars_unset(["WARDEN_TOKEN_SECRET"], || {
            let result = dispatch(&[
                "warden",
                "--token-secret",
                SECRET,
                "--db-max-connections",
                "2",
                "--db-min-connections",
                "5",
            ]);
            assert!(error_message(result).contains("--db-min-connections"));
        });
    }

    #[test]
    fn sub_second_window_rejected() {
        temp_env::with_vars_unset(["WARDEN_TOKEN_SECRET"], || {
            let result = dispatch(&[
                "warden",
                "--token-secret",
                SECRET,
                "--rate-limit-window",
                "500ms",
            ]);
            assert!(error_message(result).contains("at least 1s"));
        });
    }

    #[test]
    fn oversized_window_rejected() {
        temp_env::with_vars_unset(["WARDEN_TOKEN_SECRET"], || {
            let result = dispatch(&[
                "warden",
                "--token-secret",
                SECRET,
                "--rate-limit-window",
                "9223372036854775807s",
            ]);
            assert!(error_message(result).contains("at most 24h"));
        });
    }

    #[test]
    fn server_args_mapped() {
        temp_env::with_vars_unset(
            [
                "WARDEN_TOKEN_SECRET",
                "WARDEN_PORT",
                "WARDEN_DB_PASSWORD",
                "WARDEN_CORS_ORIGIN",
            ],
            || {
                let result = dispatch(&[
                    "warden",
                    "--token-secret",
                    SECRET,
                    "--port",
                    "9090",
                    "--token-ttl-hours",
                    "2",
                    "--db-password",
                    "hunter2",
                    "--rate-limit-requests",
                    "10",
                    "--cors-origin",
                    "http://localhost:3000",
                ]);

                let Ok(Action::Server(args)) = result else {
                    panic!("expected server action");
                };

                assert_eq!(args.server.port, 9090);
                assert_eq!(args.server.cors_origins, ["http://localhost:3000"]);
                assert_eq!(args.token_ttl, Duration::from_secs(2 * 60 * 60));
                assert_eq!(args.token_secret.expose_secret(), SECRET);
                assert_eq!(args.database.password.expose_secret(), "hunter2");
                assert_eq!(args.rate_limit.limit, 10);
                assert_eq!(args.rate_limit.window, Duration::from_secs(60));

                let debug = format!("{args:?}");
                assert!(!debug.contains("hunter2"));
                assert!(!debug.contains(SECRET));
            },
        );
    }
}
