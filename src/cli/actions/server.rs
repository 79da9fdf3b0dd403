use crate::{
    admission::{RateLimitConfig, RateLimiter},
    api::{self, AppState, ServerConfig},
    db::{self, DatabaseOptions},
    token::{JwtMaker, TokenMaker},
    user::{PgUserRepository, UserManager},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub server: ServerConfig,
    pub token_secret: SecretString,
    pub token_ttl: Duration,
    pub database: DatabaseOptions,
    pub rate_limit: RateLimitConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the token key is invalid, the database is unreachable,
/// or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let tokens: Arc<dyn TokenMaker> =
        Arc::new(JwtMaker::new(&args.token_secret).context("Invalid token secret")?);

    let pool = db::connect(&args.database).await?;

    let users = UserManager::new(Arc::new(PgUserRepository::new(pool.clone())), tokens.clone())
        .with_token_ttl(args.token_ttl);

    let state = AppState {
        users: Arc::new(users),
        tokens,
        limiter: RateLimiter::new(args.rate_limit),
    };

    let result = api::new(args.server, state).await;

    pool.close().await;
    info!("Database pool closed");

    result
}
