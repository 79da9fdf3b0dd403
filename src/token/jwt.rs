//! HS256 JWT implementation of [`TokenMaker`].

use super::{Payload, TokenError, TokenMaker};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const MIN_SECRET_KEY_SIZE: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: i64,
    issued_at: i64,
    expired_at: i64,
}

pub struct JwtMaker {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtMaker {
    /// Build a maker from the shared signing secret.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidKeySize`] when the secret is shorter than
    /// [`MIN_SECRET_KEY_SIZE`] characters.
    pub fn new(secret: &SecretString) -> Result<Self, TokenError> {
        let secret = secret.expose_secret();
        if secret.chars().count() < MIN_SECRET_KEY_SIZE {
            return Err(TokenError::InvalidKeySize {
                min: MIN_SECRET_KEY_SIZE,
            });
        }

        // Expiry lives in `expired_at` and is checked against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

impl std::fmt::Debug for JwtMaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtMaker")
            .field("algorithm", &Algorithm::HS256)
            .field("secret", &"***")
            .finish()
    }
}

fn from_unix(seconds: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(seconds, 0).ok_or(TokenError::InvalidToken)
}

impl TokenMaker for JwtMaker {
    fn create_token_at(
        &self,
        user_id: i64,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<(String, Payload), TokenError> {
        let issued_at = now.timestamp();
        let expired_at = i64::try_from(duration.as_secs())
            .ok()
            .and_then(|secs| issued_at.checked_add(secs))
            .ok_or(TokenError::InvalidDuration)?;

        let claims = Claims {
            user_id,
            issued_at,
            expired_at,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;

        let payload = Payload {
            user_id,
            issued_at: from_unix(issued_at).map_err(|_| TokenError::InvalidDuration)?,
            expired_at: from_unix(expired_at).map_err(|_| TokenError::InvalidDuration)?,
        };

        Ok((token, payload))
    }

    fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Payload, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            debug!("token rejected: {err}");
            TokenError::InvalidToken
        })?;

        let payload = Payload {
            user_id: data.claims.user_id,
            issued_at: from_unix(data.claims.issued_at)?,
            expired_at: from_unix(data.claims.expired_at)?,
        };

        if payload.is_expired_at(now) {
            return Err(TokenError::ExpiredToken);
        }

        Ok(payload)
    }
}
