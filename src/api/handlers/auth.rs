//! Registration and login. Both routes are public but rate limited.

use super::{Validation, json_body, valid_email, valid_password, valid_username};
use crate::{
    api::error::{ApiError, ErrorBody},
    user::{AuthResponse, CreateUserInput, LoginInput, User, UserError, UserService},
};
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{debug, instrument};

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = CreateUserInput,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    Extension(users): Extension<Arc<dyn UserService>>,
    payload: Result<Json<CreateUserInput>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let input = json_body(payload)?;

    Validation::default()
        .check(
            valid_username(&input.username),
            "username",
            "must be between 3 and 32 characters",
        )
        .check(
            valid_email(input.email.trim()),
            "email",
            "must be a valid email address",
        )
        .check(
            valid_password(&input.password),
            "password",
            "must be at least 8 characters",
        )
        .finish()?;

    let user = users.create_user(input).await?;
    debug!(user_id = user.id, "user registered");

    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(users): Extension<Arc<dyn UserService>>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let input = json_body(payload)?;

    Validation::default()
        .check(
            valid_email(input.email.trim()),
            "email",
            "must be a valid email address",
        )
        .check(!input.password.is_empty(), "password", "is required")
        .finish()?;

    // unknown email and wrong password must look the same to the caller
    let auth = users.login(input).await.map_err(|err| match err {
        UserError::NotFound => ApiError::from(UserError::InvalidCredentials),
        other => ApiError::from(other),
    })?;

    Ok(Json(auth))
}
