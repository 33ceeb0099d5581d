use chrono::Utc;
use sqlx::{PgPool, Result};
use uuid::Uuid;

use crate::db::models::User;

// --- User Service Functions ---

/// Creates a new user.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User> {
    let now = Utc::now();
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, username, email, password_hash, created_at, updated_at
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Retrieves a user by their ID.
pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Retrieves a user by their email address.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Retrieves a user matching either the given username or email.
/// Used to reject duplicate registrations up front.
pub async fn get_user_by_username_or_email(
    pool: &PgPool,
    username: &str,
    email: &str,
) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1 OR email = $2")
        .bind(username)
        .bind(email)
        .fetch_optional(pool)
        .await
}
