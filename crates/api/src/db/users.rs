//! User repository backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use stockroom_core::{Email, UserId, UserRole};

use super::{RepositoryError, UserStore, classify};
use crate::models::{NewUser, Pagination, ProfileChanges, User};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    phone: String,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            username: row.username,
            email,
            phone: row.phone,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for user account operations.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO inventory.user_account (username, email, phone, role, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, phone, role, created_at, updated_at
            ",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "username or email already exists"))?;

        row.try_into()
    }

    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, email, phone, role, created_at, updated_at
            FROM inventory.user_account
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, email, phone, role, created_at, updated_at
            FROM inventory.user_account
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, email, phone, role, created_at, updated_at
            FROM inventory.user_account
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let digest = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM inventory.user_account WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(digest)
    }

    async fn list(&self, page: Pagination) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, email, phone, role, created_at, updated_at
            FROM inventory.user_account
            ORDER BY id
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            UPDATE inventory.user_account
            SET email = COALESCE($2, email),
                phone = COALESCE($3, phone),
                role = COALESCE($4, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, phone, role, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(changes.email.as_ref())
        .bind(changes.phone.as_deref())
        .bind(changes.role)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "email already in use"))?
        .map(User::try_from)
        .transpose()
    }

    async fn update_password(&self, id: UserId, digest: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE inventory.user_account
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(digest)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM inventory.user_account WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
