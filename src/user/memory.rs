//! In-process [`UserRepository`] used by tests and local runs without a database.
//!
//! Mirrors the table semantics that matter to the service: sequential ids,
//! a unique email index and id ordering for pagination.

use super::{NewUser, StoreError, User, UserRepository};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

const EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, User>,
}

impl Table {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|row| row.email == email && Some(row.id) != except)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    table: RwLock<Table>,
}

impl InMemoryUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_email() -> StoreError {
    StoreError::Duplicate {
        constraint: EMAIL_CONSTRAINT.to_string(),
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|row| row.email == email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        if table.email_taken(&user.email, None) {
            return Err(duplicate_email());
        }

        table.last_id += 1;
        let created = User {
            id: table.last_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: user.created_at,
            updated_at: user.updated_at,
        };
        table.rows.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update(&self, user: &User) -> Result<bool, StoreError> {
        let mut table = self.table.write().await;
        if table.email_taken(&user.email, Some(user.id)) {
            return Err(duplicate_email());
        }

        let Some(row) = table.rows.get_mut(&user.id) else {
            return Ok(false);
        };
        row.username.clone_from(&user.username);
        row.email.clone_from(&user.email);
        row.updated_at = user.updated_at;

        Ok(true)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let table = self.table.read().await;
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(0);

        Ok(table.rows.values().skip(skip).take(take).cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_user(email: &str) -> NewUser {
        let now = Utc::now();
        NewUser {
            username: "johndoe".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_sequentially() {
        let repo = InMemoryUserRepository::new();
        let first = repo.create(new_user("a@example.com")).await.unwrap();
        let second = repo.create(new_user("b@example.com")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(repo.find(2).await.unwrap().unwrap().email, "b@example.com");
        assert!(repo.find(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_is_unique() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("a@example.com")).await.unwrap();
        let mut other = repo.create(new_user("b@example.com")).await.unwrap();

        assert!(matches!(
            repo.create(new_user("a@example.com")).await,
            Err(StoreError::Duplicate { .. })
        ));

        other.email = "a@example.com".to_string();
        assert!(matches!(
            repo.update(&other).await,
            Err(StoreError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn list_pages_in_id_order() {
        let repo = InMemoryUserRepository::new();
        for n in 0..5 {
            repo.create(new_user(&format!("user{n}@example.com")))
                .await
                .unwrap();
        }

        let page: Vec<i64> = repo
            .list(2, 1)
            .await
            .unwrap()
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(page, vec![2, 3]);
        assert!(repo.list(10, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let repo = InMemoryUserRepository::new();
        let mut user = repo.create(new_user("a@example.com")).await.unwrap();
        user.username = "jane".to_string();

        assert!(repo.update(&user).await.unwrap());
        assert_eq!(repo.find(user.id).await.unwrap().unwrap().username, "jane");
        assert!(repo.delete(user.id).await.unwrap());
        assert!(!repo.delete(user.id).await.unwrap());
        assert!(!repo.update(&user).await.unwrap());
    }
}
