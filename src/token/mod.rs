//! Signed, time-bounded identity tokens.
//!
//! A [`TokenMaker`] is the only component allowed to mint or verify tokens. The
//! payload is never persisted: it is decoded from the signed token on every
//! request that passes through the auth gate.

mod jwt;

pub use jwt::{JwtMaker, MIN_SECRET_KEY_SIZE};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid key size: must be at least {min} characters")]
    InvalidKeySize { min: usize },
    #[error("token is invalid")]
    InvalidToken,
    #[error("token has expired")]
    ExpiredToken,
    #[error("token duration is out of range")]
    InvalidDuration,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Identity carried by a verified token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Payload {
    pub user_id: i64,
    pub issued_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}

impl Payload {
    /// `true` once `now` reaches the expiry instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expired_at
    }
}

pub trait TokenMaker: Send + Sync {
    /// Sign a token for `user_id` issued at `now` and valid for `duration`.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidDuration`] if the expiry overflows, or
    /// [`TokenError::Signing`] if encoding fails.
    fn create_token_at(
        &self,
        user_id: i64,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<(String, Payload), TokenError>;

    /// Decode and check a token against `now`.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidToken`] for a bad signature, encoding or
    /// algorithm and [`TokenError::ExpiredToken`] once `now >= expired_at`.
    fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Payload, TokenError>;

    /// # Errors
    /// See [`TokenMaker::create_token_at`].
    fn create_token(&self, user_id: i64, duration: Duration) -> Result<(String, Payload), TokenError> {
        self.create_token_at(user_id, duration, Utc::now())
    }

    /// # Errors
    /// See [`TokenMaker::verify_token_at`].
    fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        self.verify_token_at(token, Utc::now())
    }
}
