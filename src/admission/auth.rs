//! Bearer-token gate for protected routes.
//!
//! The gate only reads the `Authorization` header and asks the [`TokenMaker`]
//! to verify it. On success the decoded [`Payload`] is stored in the request
//! extensions so handlers can take it with `Extension<Payload>`.

use crate::{
    api::error::ApiError,
    token::{Payload, TokenError, TokenMaker},
};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

const BEARER: &str = "bearer";

/// Verify the bearer credential carried by `headers`.
///
/// # Errors
/// Returns [`ApiError::Unauthorized`] when the header is missing, malformed,
/// uses another scheme, or the token does not verify.
pub fn authorize(headers: &HeaderMap, tokens: &dyn TokenMaker) -> Result<Payload, ApiError> {
    let value = match headers.get(AUTHORIZATION).map(|value| value.to_str()) {
        None => "",
        Some(Ok(value)) => value,
        Some(Err(_)) => {
            return Err(ApiError::Unauthorized(
                "invalid authorization header format".to_string(),
            ));
        }
    };

    if value.trim().is_empty() {
        return Err(ApiError::Unauthorized(
            "authorization header is not provided".to_string(),
        ));
    }

    let fields: Vec<&str> = value.split_whitespace().collect();
    let [scheme, token] = fields.as_slice() else {
        return Err(ApiError::Unauthorized(
            "invalid authorization header format".to_string(),
        ));
    };

    if !scheme.eq_ignore_ascii_case(BEARER) {
        return Err(ApiError::Unauthorized(format!(
            "unsupported authorization type {scheme}"
        )));
    }

    tokens.verify_token(token).map_err(|err| {
        match err {
            TokenError::ExpiredToken => debug!("rejected expired token"),
            other => warn!("rejected token: {other}"),
        }
        ApiError::Unauthorized("invalid token".to_string())
    })
}

/// axum middleware guarding a router with [`authorize`].
///
/// # Errors
/// Returns the rejection produced by [`authorize`].
pub async fn require_bearer(
    State(tokens): State<Arc<dyn TokenMaker>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let payload = authorize(request.headers(), tokens.as_ref())?;
    debug!(user_id = payload.user_id, "request authenticated");

    request.extensions_mut().insert(payload);

    Ok(next.run(request).await)
}
