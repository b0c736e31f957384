use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::User;

/// Repository trait for User persistence
///
/// Reads never return soft-deleted users. Emails stay reserved after a soft
/// delete.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> UserResult<User>;

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// Active users ordered by creation time, `page` starting at 1
    async fn list(&self, page: u64, page_size: u64) -> UserResult<Vec<User>>;

    async fn count(&self) -> UserResult<u64>;

    /// Persist profile fields, role and password hash of an active user
    async fn update(&self, user: User) -> UserResult<User>;

    /// Mark an active user deleted and return the deletion time
    async fn soft_delete(&self, id: Uuid) -> UserResult<DateTime<Utc>>;

    async fn email_exists(&self, email: &str) -> UserResult<bool>;
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| same_email(&u.email, &user.email)) {
            return Err(UserError::DuplicateEmail(user.email));
        }

        users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, email = %user.email, "Created user");
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).filter(|u| !u.is_deleted()).cloned())
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| !u.is_deleted() && same_email(&u.email, email))
            .cloned())
    }

    async fn list(&self, page: u64, page_size: u64) -> UserResult<Vec<User>> {
        let users = self.users.read().await;

        let mut active: Vec<&User> = users.values().filter(|u| !u.is_deleted()).collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let offset = page.saturating_sub(1).saturating_mul(page_size);
        Ok(active
            .into_iter()
            .skip(offset as usize)
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> UserResult<u64> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| !u.is_deleted()).count() as u64)
    }

    async fn update(&self, mut user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        let current = users
            .get(&user.id)
            .filter(|u| !u.is_deleted())
            .ok_or(UserError::NotFound(user.id))?;

        if users
            .values()
            .any(|u| u.id != user.id && same_email(&u.email, &user.email))
        {
            return Err(UserError::DuplicateEmail(user.email));
        }

        // Rating columns belong to the vote subsystem.
        user.rating = current.rating;
        user.rating_updated_at = current.rating_updated_at;
        user.created_at = current.created_at;
        user.updated_at = Utc::now();

        users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, "Updated user");
        Ok(user)
    }

    async fn soft_delete(&self, id: Uuid) -> UserResult<DateTime<Utc>> {
        let mut users = self.users.write().await;

        let user = users
            .get_mut(&id)
            .filter(|u| !u.is_deleted())
            .ok_or(UserError::NotFound(id))?;

        let now = Utc::now();
        user.deleted_at = Some(now);
        user.updated_at = now;

        tracing::info!(user_id = %id, "Soft deleted user");
        Ok(now)
    }

    async fn email_exists(&self, email: &str) -> UserResult<bool> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| same_email(&u.email, email)))
    }
}
