use std::sync::Arc;

use chrono::Utc;

use crate::crypto::{CryptoError, PasswordManager};
use crate::error::{Result, ServerError};
use crate::user::{User, UserId, UserRepository, normalize_email};

/// Registration payload, already validated.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// User manager.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    crypto: Arc<PasswordManager>,
    default_avatar: String,
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(
        repo: Arc<dyn UserRepository>,
        crypto: Arc<PasswordManager>,
        default_avatar: String,
    ) -> Self {
        Self {
            repo,
            crypto,
            default_avatar,
        }
    }

    /// Create an account.
    ///
    /// Hash password and apply default avatar.
    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        let email = normalize_email(&new_user.email);

        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(ServerError::AlreadyExists);
        }

        let user = User {
            id: UserId::new(),
            name: new_user.name.trim().to_owned(),
            email,
            password: self.crypto.hash_password(&new_user.password)?,
            avatar: self.default_avatar.clone(),
            followers: Vec::new(),
            followings: Vec::new(),
            created_at: Utc::now(),
        };

        // Store-level uniqueness still applies if a concurrent
        // registration won the race.
        self.repo.insert(&user).await?;

        tracing::info!(user_id = %user.id, "user registered");

        Ok(user)
    }

    /// Check credentials.
    ///
    /// Unknown email and wrong password both give
    /// [`ServerError::InvalidCredentials`].
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let Some(user) = self.repo.find_by_email(&normalize_email(email)).await? else {
            self.crypto.verify_dummy(password);
            return Err(ServerError::InvalidCredentials);
        };

        match self.crypto.verify_password(password, &user.password) {
            Ok(()) => Ok(user),
            Err(CryptoError::Mismatch) => Err(ServerError::InvalidCredentials),
            Err(err) => Err(err.into()),
        }
    }

    /// Find a user using `id` field.
    pub async fn find_by_id(&self, id: &UserId) -> Result<User> {
        self.repo.find_by_id(id).await?.ok_or(ServerError::NotFound)
    }

    /// Every registered user.
    pub async fn directory(&self) -> Result<Vec<User>> {
        self.repo.list().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::tests::light_config;
    use crate::user::MemoryRepository;

    pub(crate) fn service(repo: MemoryRepository) -> UserService {
        UserService::new(
            Arc::new(repo),
            Arc::new(PasswordManager::new(Some(light_config())).unwrap()),
            crate::config::DEFAULT_AVATAR.into(),
        )
    }

    fn alice() -> NewUser {
        NewUser {
            name: "alice".into(),
            email: "alice@x.com".into(),
            password: "pw1".into(),
        }
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let repo = MemoryRepository::new();
        let users = service(repo.clone());

        let user = users.register(alice()).await.unwrap();
        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();

        assert_ne!(stored.password, "pw1");
        assert!(users.crypto.verify_password("pw1", &stored.password).is_ok());
        assert_eq!(stored.avatar, crate::config::DEFAULT_AVATAR);
        assert!(stored.followers.is_empty() && stored.followings.is_empty());
    }

    #[tokio::test]
    async fn test_register_twice() {
        let repo = MemoryRepository::new();
        let users = service(repo.clone());

        users.register(alice()).await.unwrap();
        let second = NewUser {
            email: "ALICE@x.com ".into(),
            ..alice()
        };
        let err = users.register(second).await.unwrap_err();

        assert!(matches!(err, ServerError::AlreadyExists));
        let matching = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|u| u.email == "alice@x.com")
            .count();
        assert_eq!(matching, 1);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let users = service(MemoryRepository::new());
        let registered = users.register(alice()).await.unwrap();

        let user = users.authenticate("Alice@x.com", "pw1").await.unwrap();
        assert_eq!(user.id, registered.id);

        let wrong_password = users.authenticate("alice@x.com", "pw2").await.unwrap_err();
        let unknown_email = users.authenticate("bob@x.com", "pw1").await.unwrap_err();

        assert!(matches!(wrong_password, ServerError::InvalidCredentials));
        assert!(matches!(unknown_email, ServerError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_find_unknown_user() {
        let users = service(MemoryRepository::new());

        assert!(matches!(
            users.find_by_id(&UserId::new()).await,
            Err(ServerError::NotFound)
        ));
    }
}
