//! Request admission: per-client rate limiting and the bearer-token gate.

pub mod auth;
pub mod rate_limit;

pub use auth::{authorize, require_bearer};
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter, limit_by_ip};
