//! Credential store contract and the Postgres implementation.
//!
//! The session logic only sees the [`UserStore`] trait; tests exercise the
//! same code paths against an in-memory store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{NewUser, User};

/// Outcome when attempting to create a new user record.
///
/// Uniqueness is enforced by the store itself, so a race between the
/// pre-insert lookup and the insert still surfaces as `Conflict`.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(User),
    Conflict,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn create(&self, new_user: NewUser) -> Result<CreateOutcome>;

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>>;

    async fn update_avatar_url(&self, id: Uuid, url: &str) -> Result<Option<User>>;

    async fn update_cover_image_url(&self, id: Uuid, url: &str) -> Result<Option<User>>;

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()>;

    /// Overwrite the stored refresh token; `None` clears it (logout).
    async fn set_refresh_token(&self, id: Uuid, refresh_token: Option<&str>) -> Result<()>;
}

const USER_COLUMNS: &str =
    "id, username, email, full_name, password_hash, avatar_url, cover_image_url, refresh_token";

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        password_hash: row.get("password_hash"),
        avatar_url: row.get("avatar_url"),
        cover_image_url: row.get("cover_image_url"),
        refresh_token: row.get("refresh_token"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>> {
        let query = format!(
            r"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::text IS NOT NULL AND username = $1)
               OR ($2::text IS NOT NULL AND email = $2)
            LIMIT 1
        "
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by username or email")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 LIMIT 1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn create(&self, new_user: NewUser) -> Result<CreateOutcome> {
        let query = format!(
            r"
            INSERT INTO users
                (username, email, full_name, password_hash, avatar_url, cover_image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
        "
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.full_name)
            .bind(&new_user.password_hash)
            .bind(&new_user.avatar_url)
            .bind(&new_user.cover_image_url)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(user_from_row(&row))),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>> {
        let query = format!(
            r"
            UPDATE users
            SET full_name = $1, email = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {USER_COLUMNS}
        "
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(full_name)
            .bind(email)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to update profile")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_avatar_url(&self, id: Uuid, url: &str) -> Result<Option<User>> {
        let query = format!(
            r"
            UPDATE users
            SET avatar_url = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {USER_COLUMNS}
        "
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(url)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to update avatar url")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_cover_image_url(&self, id: Uuid, url: &str) -> Result<Option<User>> {
        let query = format!(
            r"
            UPDATE users
            SET cover_image_url = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {USER_COLUMNS}
        "
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(url)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to update cover image url")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let query = r"
            UPDATE users
            SET password_hash = $1, updated_at = NOW()
            WHERE id = $2
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update password hash")?;
        Ok(())
    }

    async fn set_refresh_token(&self, id: Uuid, refresh_token: Option<&str>) -> Result<()> {
        let query = r"
            UPDATE users
            SET refresh_token = $1, updated_at = NOW()
            WHERE id = $2
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(refresh_token)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to set refresh token")?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory store mirroring the Postgres uniqueness semantics.

    use super::{CreateOutcome, UserStore};
    use crate::account::types::{NewUser, User};
    use anyhow::Result;
    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    pub struct MemoryUserStore {
        users: Mutex<Vec<User>>,
    }

    impl MemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_username_or_email(
            &self,
            username: Option<&str>,
            email: Option<&str>,
        ) -> Result<Option<User>> {
            let users = self.users.lock().await;
            Ok(users
                .iter()
                .find(|user| {
                    username.is_some_and(|u| user.username == u)
                        || email.is_some_and(|e| user.email == e)
                })
                .cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
            let users = self.users.lock().await;
            Ok(users.iter().find(|user| user.id == id).cloned())
        }

        async fn create(&self, new_user: NewUser) -> Result<CreateOutcome> {
            let mut users = self.users.lock().await;
            let duplicate = users
                .iter()
                .any(|user| user.username == new_user.username || user.email == new_user.email);
            if duplicate {
                return Ok(CreateOutcome::Conflict);
            }
            let user = User {
                id: Uuid::new_v4(),
                username: new_user.username,
                email: new_user.email,
                full_name: new_user.full_name,
                password_hash: new_user.password_hash,
                avatar_url: new_user.avatar_url,
                cover_image_url: new_user.cover_image_url,
                refresh_token: None,
            };
            users.push(user.clone());
            Ok(CreateOutcome::Created(user))
        }

        async fn update_profile(
            &self,
            id: Uuid,
            full_name: &str,
            email: &str,
        ) -> Result<Option<User>> {
            let mut users = self.users.lock().await;
            Ok(users.iter_mut().find(|user| user.id == id).map(|user| {
                user.full_name = full_name.to_string();
                user.email = email.to_string();
                user.clone()
            }))
        }

        async fn update_avatar_url(&self, id: Uuid, url: &str) -> Result<Option<User>> {
            let mut users = self.users.lock().await;
            Ok(users.iter_mut().find(|user| user.id == id).map(|user| {
                user.avatar_url = url.to_string();
                user.clone()
            }))
        }

        async fn update_cover_image_url(&self, id: Uuid, url: &str) -> Result<Option<User>> {
            let mut users = self.users.lock().await;
            Ok(users.iter_mut().find(|user| user.id == id).map(|user| {
                user.cover_image_url = url.to_string();
                user.clone()
            }))
        }

        async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
            let mut users = self.users.lock().await;
            if let Some(user) = users.iter_mut().find(|user| user.id == id) {
                user.password_hash = password_hash.to_string();
            }
            Ok(())
        }

        async fn set_refresh_token(&self, id: Uuid, refresh_token: Option<&str>) -> Result<()> {
            let mut users = self.users.lock().await;
            if let Some(user) = users.iter_mut().find(|user| user.id == id) {
                user.refresh_token = refresh_token.map(str::to_string);
            }
            Ok(())
        }
    }
}
