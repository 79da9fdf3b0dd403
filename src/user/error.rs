use thiserror::Error;

/// Failures reported by a [`super::UserRepository`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value violates {constraint}")]
    Duplicate { constraint: String },
    #[error("user store unavailable")]
    Unavailable(#[source] sqlx::Error),
    #[error("user store failure")]
    Backend(#[source] sqlx::Error),
}

impl StoreError {
    /// Pool exhaustion and connection loss are worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err)
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Duplicate {
                constraint: db.constraint().unwrap_or("unique").to_string(),
            },
            _ => Self::Backend(err),
        }
    }
}

/// Domain failures of the user service. Transport mapping happens in the API layer.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,
    #[error("email already exists")]
    EmailAlreadyExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user store unavailable")]
    Unavailable(#[source] StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for UserError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => Self::EmailAlreadyExists,
            StoreError::Unavailable(_) => Self::Unavailable(err),
            StoreError::Backend(_) => Self::Internal(anyhow::Error::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_retryable() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
        assert!(matches!(UserError::from(err), UserError::Unavailable(_)));
    }

    #[test]
    fn row_errors_are_internal() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(!err.is_retryable());
        assert!(matches!(UserError::from(err), UserError::Internal(_)));
    }

    #[test]
    fn duplicates_map_to_email_conflict() {
        let err = StoreError::Duplicate {
            constraint: "users_email_key".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate value violates users_email_key");
        assert!(matches!(UserError::from(err), UserError::EmailAlreadyExists));
    }
}
