//! Sliding-window rate limiting keyed by client address.
//!
//! Each key keeps the instants of its recent requests. An instant stays valid
//! while `now - t <= window` (inclusive), so a request exactly one window old
//! still counts against the limit. State is pruned on every admission and by a
//! periodic sweep that drops keys left without requests.

use crate::api::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, warn};

const UNKNOWN_CLIENT: &str = "unknown";

/// Upper bound for the sweep period so the first tick always fits in an `Instant`.
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per key inside one window.
    pub limit: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window: Duration::from_secs(60),
        }
    }
}

struct Shared {
    config: RateLimitConfig,
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn sweep(&self, now: Instant) -> usize {
        let window = self.config.window;
        let mut requests = self.requests.lock();
        let before = requests.len();
        requests.retain(|_, entries| {
            prune(entries, now, window);
            !entries.is_empty()
        });
        before - requests.len()
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup.get_mut().take() {
            handle.abort();
        }
    }
}

fn prune(entries: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    entries.retain(|seen| now.saturating_duration_since(*seen) <= window);
}

/// In-memory limiter shared by every request task.
///
/// Cloning is cheap; all clones share one map guarded by a single lock. The
/// cleanup task only holds a weak reference and stops with the last clone.
#[derive(Clone)]
pub struct RateLimiter {
    shared: Arc<Shared>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                requests: Mutex::new(HashMap::new()),
                cleanup: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> RateLimitConfig {
        self.shared.config
    }

    /// Record a request for `key` at `now` unless the key is over its limit.
    pub fn admit(&self, key: &str, now: Instant) -> RateLimitDecision {
        let RateLimitConfig { limit, window } = self.shared.config;
        let mut requests = self.shared.requests.lock();
        let entries = requests.entry(key.to_owned()).or_default();
        prune(entries, now, window);

        if entries.len() >= limit {
            return RateLimitDecision::Limited;
        }

        entries.push_back(now);
        RateLimitDecision::Allowed
    }

    /// Prune every key and forget the ones left empty. Returns how many keys were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        self.shared.sweep(now)
    }

    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.shared.requests.lock().len()
    }

    /// Spawn the periodic sweep, one per window and at least once a day.
    /// Calling it twice is a no-op.
    pub fn start_cleanup(&self) {
        let mut cleanup = self.shared.cleanup.lock();
        if cleanup.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let period = self
            .shared
            .config
            .window
            .clamp(Duration::from_millis(1), MAX_SWEEP_PERIOD);
        let shared = Arc::downgrade(&self.shared);

        *cleanup = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(shared) = shared.upgrade() else {
                    break;
                };

                let removed = shared.sweep(Instant::now());
                if removed > 0 {
                    debug!(removed, "rate limiter sweep released idle clients");
                }
            }
        }));
    }

    pub fn stop_cleanup(&self) {
        if let Some(handle) = self.shared.cleanup.lock().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.shared.config)
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}

/// axum middleware admitting requests per peer IP.
///
/// Without connection info (e.g. in-process tests) every request shares one
/// bucket.
pub async fn limit_by_ip(
    State(limiter): State<RateLimiter>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let key = connect_info.map_or_else(
        || UNKNOWN_CLIENT.to_string(),
        |ConnectInfo(addr)| addr.ip().to_string(),
    );

    match limiter.admit(&key, Instant::now()) {
        RateLimitDecision::Allowed => next.run(request).await,
        RateLimitDecision::Limited => {
            warn!(client = %key, "rate limit exceeded");
            ApiError::TooManyRequests {
                retry_after: limiter.config().window,
            }
            .into_response()
        }
    }
}
