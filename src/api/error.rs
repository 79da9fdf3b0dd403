//! Error taxonomy of the HTTP boundary and its JSON rendering.
//!
//! Domain errors map 1:1 onto these variants. Internal failures are logged
//! with their full context and answered with a generic message.

use crate::user::UserError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Suggested client back-off when the database pool is exhausted.
const UNAVAILABLE_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{message}")]
    InvalidInput {
        message: String,
        details: Vec<FieldError>,
    },
    #[error("rate limit exceeded")]
    TooManyRequests { retry_after: Duration },
    #[error("service temporarily unavailable")]
    Unavailable { retry_after: Duration },
    #[error("internal server error: {0:#}")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            details: Vec::new(),
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => Self::NotFound("user not found".to_string()),
            UserError::EmailAlreadyExists => Self::Conflict("email already exists".to_string()),
            UserError::InvalidCredentials => {
                Self::Unauthorized("invalid credentials".to_string())
            }
            UserError::Unavailable(source) => {
                warn!("user store unavailable: {source}");
                Self::Unavailable {
                    retry_after: UNAVAILABLE_RETRY_AFTER,
                }
            }
            UserError::Internal(source) => Self::Internal(source),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_input(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_input(format!("invalid query string: {}", rejection.body_text()))
    }
}

fn retry_after_header(retry_after: Duration) -> Option<HeaderValue> {
    let seconds = retry_after.as_secs().max(1);
    HeaderValue::from_str(&seconds.to_string()).ok()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let retry_after = match &self {
            Self::TooManyRequests { retry_after } | Self::Unavailable { retry_after } => {
                retry_after_header(*retry_after)
            }
            _ => None,
        };

        let (message, details) = match self {
            Self::Internal(err) => {
                error!("Internal error: {err:#}");
                ("internal server error".to_string(), None)
            }
            Self::InvalidInput { message, details } => {
                (message, (!details.is_empty()).then_some(details))
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            code: status.as_u16(),
            message,
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(value) = retry_after {
            response.headers_mut().insert(RETRY_AFTER, value);
        }

        response
    }
}
