//! API handlers and the request validation they share.
//!
//! Handlers only parse and validate input; business rules live behind
//! [`crate::user::UserService`].

pub mod auth;
pub mod health;
pub mod users;

use super::error::{ApiError, FieldError};
use axum::{Json, extract::rejection::JsonRejection};
use regex::Regex;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Lightweight email sanity check used before touching the store.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

pub fn valid_username(username: &str) -> bool {
    let trimmed = username.trim();
    trimmed.len() == username.len()
        && (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&trimmed.chars().count())
}

pub fn valid_password(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN_LEN
}

/// Collects per-field failures so the client sees all of them at once.
#[derive(Debug, Default)]
pub struct Validation {
    errors: Vec<FieldError>,
}

impl Validation {
    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError {
                field: field.to_string(),
                message: message.to_string(),
            });
        }
        self
    }

    /// # Errors
    /// Returns [`ApiError::InvalidInput`] listing every failed check.
    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::InvalidInput {
                message: "validation failed".to_string(),
                details: std::mem::take(&mut self.errors),
            })
        }
    }
}

/// Unwrap a JSON body, turning axum's rejection into a 400 with our error shape.
///
/// # Errors
/// Returns [`ApiError::InvalidInput`] when the body is missing or malformed.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(ApiError::from)
}
