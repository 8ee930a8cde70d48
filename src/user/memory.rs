//! In-process user store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, ServerError};
use crate::follow::{Operation, Relationship, self_follow};
use crate::user::{User, UserId, UserRepository};

/// [`UserRepository`] keeping users in memory.
///
/// Used when no PostgreSQL instance is configured, and by tests.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl MemoryRepository {
    /// Create an empty [`MemoryRepository`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `user` as is, bypassing uniqueness checks.
    pub async fn put(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.id) || users.values().any(|u| u.email == user.email) {
            return Err(ServerError::AlreadyExists);
        }
        users.insert(user.id, user.clone());

        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(users)
    }

    async fn save_follows(&self, users: &[&User]) -> Result<()> {
        let mut stored = self.users.write().await;

        if users.iter().any(|user| !stored.contains_key(&user.id)) {
            return Err(ServerError::NotFound);
        }

        for user in users {
            if let Some(entry) = stored.get_mut(&user.id) {
                entry.followers = user.followers.clone();
                entry.followings = user.followings.clone();
            }
        }

        Ok(())
    }

    async fn update_edge(
        &self,
        follower: &UserId,
        followed: &UserId,
        operation: Operation,
    ) -> Result<(Relationship, bool)> {
        let mut stored = self.users.write().await;

        let (Some(follower), Some(followed)) = (stored.get(follower), stored.get(followed)) else {
            return Err(ServerError::NotFound);
        };
        let mut relationship = Relationship::new(follower.clone(), followed.clone())
            .ok_or_else(|| ServerError::from(self_follow()))?;

        if !relationship.apply(operation) {
            return Ok((relationship, false));
        }

        for user in [&relationship.followed, &relationship.follower] {
            if let Some(entry) = stored.get_mut(&user.id) {
                entry.followers = user.followers.clone();
                entry.followings = user.followings.clone();
            }
        }

        Ok((relationship, true))
    }
}
