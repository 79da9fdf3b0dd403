//! User service: registration, login and account maintenance.
//!
//! Each operation is at most a lookup followed by one write; the unique email
//! index in the store backs up the lookup when two registrations race.

use super::{
    AuthResponse, CreateUserInput, LoginInput, NewUser, UpdateUserInput, User, UserError,
    UserRepository, normalize_email, password,
};
use crate::token::TokenMaker;
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, instrument};

/// Default validity of tokens issued on login.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[async_trait]
pub trait UserService: Send + Sync {
    async fn create_user(&self, input: CreateUserInput) -> Result<User, UserError>;

    async fn login(&self, input: LoginInput) -> Result<AuthResponse, UserError>;

    async fn get_user(&self, id: i64) -> Result<User, UserError>;

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, UserError>;

    async fn update_user(&self, id: i64, input: UpdateUserInput) -> Result<User, UserError>;

    async fn delete_user(&self, id: i64) -> Result<(), UserError>;
}

pub struct UserManager {
    repo: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenMaker>,
    token_ttl: Duration,
}

impl UserManager {
    #[must_use]
    pub fn new(repo: Arc<dyn UserRepository>, tokens: Arc<dyn TokenMaker>) -> Self {
        Self {
            repo,
            tokens,
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    #[must_use]
    pub const fn with_token_ttl(mut self, token_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self
    }

    #[must_use]
    pub const fn token_ttl(&self) -> Duration {
        self.token_ttl
    }
}

impl std::fmt::Debug for UserManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserManager")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl UserService for UserManager {
    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn create_user(&self, input: CreateUserInput) -> Result<User, UserError> {
        let email = normalize_email(&input.email);
        if self.repo.find_by_email(&email).await?.is_some() {
            debug!("email already registered");
            return Err(UserError::EmailAlreadyExists);
        }

        let secret = input.password;
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&secret))
            .await
            .context("password hashing task failed")??;

        let now = Utc::now();
        let user = self
            .repo
            .create(NewUser {
                username: input.username,
                email,
                password_hash,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(user_id = user.id, "user registered");

        Ok(user)
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn login(&self, input: LoginInput) -> Result<AuthResponse, UserError> {
        let email = normalize_email(&input.email);
        let user = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(UserError::NotFound)?;

        let stored = user.password_hash.clone();
        let secret = input.password;
        let matches =
            tokio::task::spawn_blocking(move || password::verify_password(&stored, &secret))
                .await
                .context("password verification task failed")??;

        if !matches {
            debug!(user_id = user.id, "password mismatch");
            return Err(UserError::InvalidCredentials);
        }

        let (token, payload) = self
            .tokens
            .create_token(user.id, self.token_ttl)
            .context("failed to issue token")?;

        info!(user_id = user.id, "user logged in");

        Ok(AuthResponse {
            user,
            token,
            expires_at: payload.expired_at,
        })
    }

    async fn get_user(&self, id: i64) -> Result<User, UserError> {
        self.repo.find(id).await?.ok_or(UserError::NotFound)
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, UserError> {
        Ok(self.repo.list(limit, offset).await?)
    }

    #[instrument(skip(self, input))]
    async fn update_user(&self, id: i64, input: UpdateUserInput) -> Result<User, UserError> {
        let mut user = self.repo.find(id).await?.ok_or(UserError::NotFound)?;

        if let Some(email) = input.email.as_deref().map(normalize_email) {
            if email != user.email {
                if let Some(owner) = self.repo.find_by_email(&email).await? {
                    if owner.id != id {
                        return Err(UserError::EmailAlreadyExists);
                    }
                }
                user.email = email;
            }
        }

        if let Some(username) = input.username {
            user.username = username;
        }

        user.updated_at = Utc::now();

        if !self.repo.update(&user).await? {
            return Err(UserError::NotFound);
        }

        info!(user_id = id, "user updated");

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: i64) -> Result<(), UserError> {
        if !self.repo.delete(id).await? {
            return Err(UserError::NotFound);
        }

        info!(user_id = id, "user deleted");

        Ok(())
    }
}
