//! User management endpoints. Every route here sits behind the bearer gate.

use super::{Validation, json_body, valid_email, valid_username};
use crate::{
    api::error::{ApiError, ErrorBody},
    token::Payload,
    user::{UpdateUserInput, User, UserService},
};
use axum::{
    Json,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::IntoParams;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw pagination parameters; parsed by hand so bad values get our error shape.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Page size, 1 to 100. Defaults to 20.
    #[param(value_type = Option<i64>)]
    pub limit: Option<String>,
    /// Number of users to skip. Defaults to 0.
    #[param(value_type = Option<i64>)]
    pub offset: Option<String>,
}

impl ListParams {
    /// # Errors
    /// Returns [`ApiError::InvalidInput`] for non-numeric or out-of-range values.
    pub fn page(&self) -> Result<(i64, i64), ApiError> {
        let limit = match self.limit.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_PAGE_SIZE,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|limit| (1..=MAX_PAGE_SIZE).contains(limit))
                .ok_or_else(|| {
                    ApiError::invalid_input(format!(
                        "limit must be an integer between 1 and {MAX_PAGE_SIZE}"
                    ))
                })?,
        };

        let offset = match self.offset.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|offset| *offset >= 0)
                .ok_or_else(|| ApiError::invalid_input("offset must be a non-negative integer"))?,
        };

        Ok((limit, offset))
    }
}

/// # Errors
/// Returns [`ApiError::InvalidInput`] unless `raw` is a positive integer.
pub fn parse_user_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::invalid_input("invalid user id"))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(ListParams),
    responses(
        (status = 200, description = "Page of users ordered by id", body = [User]),
        (status = 400, description = "Invalid pagination", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
#[instrument(skip_all, fields(caller = principal.user_id))]
pub async fn list_users(
    Extension(users): Extension<Arc<dyn UserService>>,
    Extension(principal): Extension<Payload>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<User>>, ApiError> {
    let Query(params) = query?;
    let (limit, offset) = params.page()?;
    let list = users.list_users(limit, offset).await?;
    debug!(limit, offset, returned = list.len(), "listed users");

    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User detail", body = User),
        (status = 400, description = "Invalid user id", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
#[instrument(skip_all, fields(caller = principal.user_id))]
pub async fn get_user(
    Extension(users): Extension<Arc<dyn UserService>>,
    Extension(principal): Extension<Payload>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_user_id(&id)?;

    Ok(Json(users.get_user(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserInput,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Invalid user id or payload", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
#[instrument(skip_all, fields(caller = principal.user_id))]
pub async fn update_user(
    Extension(users): Extension<Arc<dyn UserService>>,
    Extension(principal): Extension<Payload>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserInput>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let id = parse_user_id(&id)?;
    let input = json_body(payload)?;

    if input.is_empty() {
        return Err(ApiError::invalid_input("no fields to update"));
    }

    Validation::default()
        .check(
            input.username.as_deref().is_none_or(valid_username),
            "username",
            "must be between 3 and 32 characters",
        )
        .check(
            input.email.as_deref().map(str::trim).is_none_or(valid_email),
            "email",
            "must be a valid email address",
        )
        .finish()?;

    Ok(Json(users.update_user(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Invalid user id", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
#[instrument(skip_all, fields(caller = principal.user_id))]
pub async fn delete_user(
    Extension(users): Extension<Arc<dyn UserService>>,
    Extension(principal): Extension<Payload>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_user_id(&id)?;
    users.delete_user(id).await?;
    debug!(user_id = id, "user deleted");

    Ok(StatusCode::NO_CONTENT)
}
