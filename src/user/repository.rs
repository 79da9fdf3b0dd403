use super::{NewUser, StoreError, User};
use async_trait::async_trait;

/// Persistence contract for user records.
///
/// Lookups return `Ok(None)` for a missing row so callers can tell "not found"
/// apart from a storage failure. `update` and `delete` report whether a row
/// was touched.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a record and return it with the id assigned by the store.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn update(&self, user: &User) -> Result<bool, StoreError>;

    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Page through users ordered by id.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError>;
}
