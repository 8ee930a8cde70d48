mod memory;
mod repository;
mod service;

pub use memory::*;
pub use repository::*;
pub use service::*;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-generated user identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a new random [`UserId`].
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an hyphenated UUID.
    pub fn parse(id: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(id)?))
    }

    #[inline]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub avatar: String,
    /// Accounts following this user.
    pub followers: Vec<UserId>,
    /// Accounts this user follows.
    pub followings: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Directory entry of a [`User`]. No private data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub avatar: String,
    pub followers: Vec<UserId>,
    pub followings: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            avatar: user.avatar,
            followers: user.followers,
            followings: user.followings,
            created_at: user.created_at,
        }
    }
}

/// Authenticated caller, recovered from a bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// Lower-case and trim an email so lookups ignore casing.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_never_serialized() {
        let user = User {
            id: UserId::new(),
            name: "alice".into(),
            email: "alice@x.com".into(),
            password: "$argon2id$secret".into(),
            avatar: String::default(),
            followers: Vec::new(),
            followings: Vec::new(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert!(!json.to_string().contains("$argon2id$secret"));
        assert_eq!(json["id"], user.id.to_string());

        let profile = serde_json::to_value(Profile::from(user)).unwrap();
        assert!(profile.get("email").is_none());
    }

    #[test]
    fn test_user_id_parse() {
        let id = UserId::new();

        assert_eq!(UserId::parse(&id.to_string()).unwrap(), id);
        assert!(UserId::parse("alice").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@X.com "), "alice@x.com");
    }
}
