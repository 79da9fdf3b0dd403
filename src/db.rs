//! Database bootstrap: DSN assembly, pool sizing, startup retry and schema.

use anyhow::{Context, Result, anyhow};
use secrecy::{ExposeSecret, SecretString};
use sqlx::{Connection, PgPool, postgres::PgPoolOptions};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

const SCHEMA: &str = include_str!("../sql/schema.sql");

const PING_TIMEOUT: Duration = Duration::from_secs(5);

pub const SSL_MODES: [&str; 6] = [
    "disable",
    "allow",
    "prefer",
    "require",
    "verify-ca",
    "verify-full",
];

#[derive(Clone)]
pub struct DatabaseOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub name: String,
    pub sslmode: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
    pub connect_retries: u32,
    pub connect_retry_interval: Duration,
}

impl std::fmt::Debug for DatabaseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("name", &self.name)
            .field("sslmode", &self.sslmode)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("max_lifetime", &self.max_lifetime)
            .field("idle_timeout", &self.idle_timeout)
            .field("connect_retries", &self.connect_retries)
            .field("connect_retry_interval", &self.connect_retry_interval)
            .finish()
    }
}

impl DatabaseOptions {
    /// Build the connection URL. It embeds the password, never log it.
    ///
    /// # Errors
    /// Returns error if the host or credentials cannot be encoded in a URL
    pub fn dsn(&self) -> Result<Url> {
        let mut dsn = Url::parse(&format!("postgres://{}:{}", self.host, self.port))
            .with_context(|| format!("Invalid database host: {}", self.host))?;

        dsn.set_path(&self.name);

        dsn.set_username(&self.user)
            .map_err(|()| anyhow!("Error setting username"))?;

        dsn.set_password(Some(self.password.expose_secret()))
            .map_err(|()| anyhow!("Error setting password"))?;

        dsn.query_pairs_mut().append_pair("sslmode", &self.sslmode);

        Ok(dsn)
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .max_lifetime(self.max_lifetime)
            .idle_timeout(self.idle_timeout)
    }
}

/// Connect, retrying `connect_retries` times, then ping and apply the schema.
///
/// # Errors
/// Returns error if the database stays unreachable or the schema cannot be applied
pub async fn connect(options: &DatabaseOptions) -> Result<PgPool> {
    let dsn = options.dsn()?;

    info!(
        host = %options.host,
        port = options.port,
        database = %options.name,
        "Connecting to database"
    );

    let mut attempt: u32 = 0;
    let pool = loop {
        let connect_span = info_span!(
            "db.connect",
            db.system = "postgresql",
            db.operation = "CONNECT",
            attempt
        );

        match options
            .pool_options()
            .connect(dsn.as_str())
            .instrument(connect_span)
            .await
        {
            Ok(pool) => break pool,
            Err(err) if attempt < options.connect_retries => {
                attempt += 1;
                warn!(
                    "Failed to connect to database: {err}, retry {attempt}/{} in {:?}",
                    options.connect_retries, options.connect_retry_interval
                );
                sleep(options.connect_retry_interval).await;
            }
            Err(err) => return Err(err).context("Failed to connect to database"),
        }
    };

    ping(&pool).await?;
    migrate(&pool).await?;

    Ok(pool)
}

/// # Errors
/// Returns error if no connection can be acquired and pinged within 5 seconds
pub async fn ping(pool: &PgPool) -> Result<()> {
    let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");

    timeout(PING_TIMEOUT, async {
        let mut conn = pool.acquire().await?;
        conn.ping().await
    })
    .instrument(ping_span)
    .await
    .context("Timed out pinging database")?
    .context("Failed to ping database")?;

    debug!("Database connection is healthy");

    Ok(())
}

/// Apply the idempotent `users` schema.
///
/// # Errors
/// Returns error if the DDL fails
pub async fn migrate(pool: &PgPool) -> Result<()> {
    let schema_span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "CREATE"
    );

    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .instrument(schema_span)
        .await
        .context("Failed to apply database schema")?;

    Ok(())
}
