use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::utils::error::AppError;

/// Account record. Password hashes never leave this struct; projections
/// pick the public fields.
#[allow(dead_code)]
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

const USER_SELECT: &str =
    "SELECT id, username, email, password_hash, first_name, is_staff, created_at FROM users";

impl User {
    pub async fn create(
        pool: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
        first_name: Option<&str>,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, first_name) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, username, email, password_hash, first_name, is_staff, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .fetch_one(pool)
        .await
        .map_err(map_unique_violation)
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("{} WHERE id = $1", USER_SELECT);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("{} WHERE username = $1", USER_SELECT);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn username_taken(pool: &PgPool, username: &str) -> Result<bool, AppError> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(pool)
                .await?,
        )
    }

    pub async fn email_taken(pool: &PgPool, email: &str) -> Result<bool, AppError> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(pool)
                .await?,
        )
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<User>, AppError> {
        let sql = format!("{} ORDER BY created_at, id", USER_SELECT);
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?)
    }
}

/// Concurrent signups can slip past the existence pre-checks; the unique
/// constraints are the backstop and still surface as 409.
fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let message = match db_err.constraint() {
                Some("users_email_key") => "Email already exists",
                _ => "Username already taken",
            };
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::Database(err)
}
