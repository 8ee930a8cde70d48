//! Handle database requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{Result, ServerError};
use crate::follow::{Operation, Relationship, self_follow};
use crate::user::{User, UserId};

/// Port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user using `id` field.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>>;

    /// Find a user using normalized `email` field.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new [`User`].
    ///
    /// Fails with [`ServerError::AlreadyExists`] when the email is taken.
    async fn insert(&self, user: &User) -> Result<()>;

    /// Every user, oldest first.
    async fn list(&self) -> Result<Vec<User>>;

    /// Persist `followers` and `followings` of each user, in order.
    ///
    /// Either every user is written or none is. A missing user fails the
    /// whole call with [`ServerError::NotFound`].
    async fn save_follows(&self, users: &[&User]) -> Result<()>;

    /// Load `follower` and `followed`, apply `operation` and persist the
    /// pair, with no concurrent writer in between.
    ///
    /// Returns the resulting pair and whether anything was written.
    /// A missing user fails with [`ServerError::NotFound`] before any
    /// write.
    async fn update_edge(
        &self,
        follower: &UserId,
        followed: &UserId,
        operation: Operation,
    ) -> Result<(Relationship, bool)>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password: String,
    avatar: String,
    followers: Vec<Uuid>,
    followings: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            email: row.email,
            password: row.password,
            avatar: row.avatar,
            followers: row.followers.into_iter().map(UserId::from).collect(),
            followings: row.followings.into_iter().map(UserId::from).collect(),
            created_at: row.created_at,
        }
    }
}

const SELECT_USER: &str = r#"SELECT id, name, email, password, avatar, followers, followings, created_at
    FROM users"#;

fn uuids(ids: &[UserId]) -> Vec<Uuid> {
    ids.iter().map(UserId::as_uuid).collect()
}

/// PostgreSQL adapter.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: Pool<Postgres>,
}

impl PostgresRepository {
    /// Create a new [`PostgresRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn insert(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"INSERT INTO users (id, name, email, password, avatar, followers, followings, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.avatar)
        .bind(uuids(&user.followers))
        .bind(uuids(&user.followings))
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(ServerError::AlreadyExists)
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} ORDER BY created_at, id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn save_follows(&self, users: &[&User]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for user in users {
            if !write_follows(&mut tx, user).await? {
                tx.rollback().await?;
                return Err(ServerError::NotFound);
            }
        }

        tx.commit().await?;

        Ok(())
    }

    async fn update_edge(
        &self,
        follower: &UserId,
        followed: &UserId,
        operation: Operation,
    ) -> Result<(Relationship, bool)> {
        if follower == followed {
            return Err(self_follow().into());
        }

        let mut tx = self.pool.begin().await?;

        // Row locks are taken in id order so two opposite edges cannot deadlock.
        let mut users: Vec<User> = sqlx::query_as::<_, UserRow>(&format!(
            "{SELECT_USER} WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(vec![follower.as_uuid(), followed.as_uuid()])
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

        let (Some(follower), Some(followed)) = (
            take(&mut users, follower),
            take(&mut users, followed),
        ) else {
            tx.rollback().await?;
            return Err(ServerError::NotFound);
        };
        let mut relationship =
            Relationship::new(follower, followed).ok_or_else(|| ServerError::from(self_follow()))?;

        if !relationship.apply(operation) {
            tx.rollback().await?;
            return Ok((relationship, false));
        }

        write_follows(&mut tx, &relationship.followed).await?;
        write_follows(&mut tx, &relationship.follower).await?;
        tx.commit().await?;

        Ok((relationship, true))
    }
}

fn take(users: &mut Vec<User>, id: &UserId) -> Option<User> {
    let position = users.iter().position(|user| &user.id == id)?;
    Some(users.swap_remove(position))
}

/// Update edge lists of `user`. `false` when no row matched.
async fn write_follows(tx: &mut Transaction<'_, Postgres>, user: &User) -> Result<bool> {
    let result = sqlx::query(r#"UPDATE users SET followers = $1, followings = $2 WHERE id = $3"#)
        .bind(uuids(&user.followers))
        .bind(uuids(&user.followings))
        .bind(user.id.as_uuid())
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() == 1)
}
