use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{User, UserFilter};

/// Repository trait for staff accounts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; the email must not be taken
    async fn create(&self, user: User) -> UserResult<User>;

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    /// `email` is expected lowercased
    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// Ordered by email
    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>>;

    async fn update(&self, user: User) -> UserResult<User>;

    async fn delete(&self, id: Uuid) -> UserResult<bool>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> UserResult<()>;
}

/// In-memory implementation (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(UserError::DuplicateEmail(user.email));
        }

        users.insert(user.id, user.clone());
        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        let users = self.users.read().await;

        let mut result: Vec<User> = users.values().filter(|u| filter.matches(u)).cloned().collect();
        result.sort_by(|a, b| a.email.cmp(&b.email));

        Ok(result
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;
        let slot = users.get_mut(&user.id).ok_or(UserError::NotFound(user.id))?;
        *slot = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> UserResult<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn user(email: &str) -> User {
        User::new(email.into(), "Staff".into(), "hash".into(), vec![Role::Support])
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create(user("ops@shop.test")).await.unwrap();

        let result = repo.create(user("ops@shop.test")).await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_list_is_ordered_and_paginated() {
        let repo = InMemoryUserRepository::new();
        for email in ["c@shop.test", "a@shop.test", "b@shop.test"] {
            repo.create(user(email)).await.unwrap();
        }

        let page = repo
            .list(UserFilter {
                limit: 2,
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        let emails: Vec<_> = page.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, ["b@shop.test", "c@shop.test"]);
    }

    #[tokio::test]
    async fn test_record_login_sets_timestamp() {
        let repo = InMemoryUserRepository::new();
        let created = repo.create(user("ops@shop.test")).await.unwrap();
        let now = Utc::now();

        repo.record_login(created.id, now).await.unwrap();
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.last_login_at, Some(now));
    }
}
