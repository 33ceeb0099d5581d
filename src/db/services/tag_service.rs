use chrono::Utc;
use sqlx::{PgPool, Result};
use uuid::Uuid;

use crate::db::models::Tag;

// --- Tag Service Functions ---

/// Creates a new tag for a user. The `(user_id, name)` unique index turns a
/// duplicate name into a database error the handler maps to a conflict.
pub async fn create_tag(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
    color1: &str,
    color2: &str,
) -> Result<Tag> {
    let now = Utc::now();
    sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (user_id, name, color1, color2, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, name, color1, color2, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(color1)
    .bind(color2)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Retrieves all tags for a user, ordered by name.
pub async fn get_tags_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Tag>> {
    sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE user_id = $1 ORDER BY name ASC")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

/// Retrieves a single tag owned by the user.
pub async fn get_tag_by_id(pool: &PgPool, tag_id: Uuid, user_id: Uuid) -> Result<Option<Tag>> {
    sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE id = $1 AND user_id = $2")
        .bind(tag_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Looks a tag up by name for duplicate checks, excluding `exclude_id` so a
/// rename can keep its own name.
pub async fn find_tag_by_name(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
    exclude_id: Option<Uuid>,
) -> Result<Option<Tag>> {
    sqlx::query_as::<_, Tag>(
        "SELECT * FROM tags WHERE user_id = $1 AND name = $2 AND ($3::uuid IS NULL OR id != $3)",
    )
    .bind(user_id)
    .bind(name)
    .bind(exclude_id)
    .fetch_optional(pool)
    .await
}

/// Updates a tag's name and colors. Returns `None` when the tag does not
/// exist or belongs to another user.
pub async fn update_tag(
    pool: &PgPool,
    tag_id: Uuid,
    user_id: Uuid,
    name: &str,
    color1: &str,
    color2: &str,
) -> Result<Option<Tag>> {
    let now = Utc::now();
    sqlx::query_as::<_, Tag>(
        r#"
        UPDATE tags
        SET name = $1, color1 = $2, color2 = $3, updated_at = $4
        WHERE id = $5 AND user_id = $6
        RETURNING id, user_id, name, color1, color2, created_at, updated_at
        "#,
    )
    .bind(name)
    .bind(color1)
    .bind(color2)
    .bind(now)
    .bind(tag_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Deletes a tag. The ON DELETE CASCADE on `item_tags` removes associations.
pub async fn delete_tag(pool: &PgPool, tag_id: Uuid, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND user_id = $2")
        .bind(tag_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
