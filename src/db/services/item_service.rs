use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Result};
use uuid::Uuid;

use crate::db::models::{SavedItem, TagRef};

// --- Saved Item Service Functions ---

/// Field set for inserting a new saved item. `article_text` is expected to
/// be sanitized by the caller before it reaches this layer.
#[derive(Debug, Default)]
pub struct NewSavedItem {
    pub item_type: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub site_name: Option<String>,
    pub article_text: Option<String>,
}

#[derive(FromRow)]
struct ItemTagRow {
    item_id: Uuid,
    id: Uuid,
    name: String,
}

/// Inserts a new saved item for a user. `date` defaults to now when the
/// extension did not supply one.
pub async fn create_item(pool: &PgPool, user_id: Uuid, item: NewSavedItem) -> Result<SavedItem> {
    let now = Utc::now();
    sqlx::query_as::<_, SavedItem>(
        r#"
        INSERT INTO saved_items
            (user_id, type, content, url, date, title, description, author,
             site_name, article_text, is_read, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, $11, $11)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&item.item_type)
    .bind(&item.content)
    .bind(&item.url)
    .bind(item.date.unwrap_or(now))
    .bind(&item.title)
    .bind(&item.description)
    .bind(&item.author)
    .bind(&item.site_name)
    .bind(&item.article_text)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Retrieves all items owned by a user, newest first.
pub async fn get_items_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<SavedItem>> {
    sqlx::query_as::<_, SavedItem>(
        "SELECT * FROM saved_items WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Retrieves a single item owned by the user.
pub async fn get_item_by_id(pool: &PgPool, item_id: Uuid, user_id: Uuid) -> Result<Option<SavedItem>> {
    sqlx::query_as::<_, SavedItem>("SELECT * FROM saved_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Persists an already-merged item state. Callers fetch the row first (which
/// establishes ownership), apply the partial update in memory, then write the
/// whole row back.
pub async fn update_item(pool: &PgPool, item: &SavedItem) -> Result<SavedItem> {
    sqlx::query_as::<_, SavedItem>(
        r#"
        UPDATE saved_items
        SET type = $1, content = $2, url = $3, date = $4, title = $5,
            description = $6, author = $7, site_name = $8, article_text = $9,
            is_read = $10, updated_at = $11
        WHERE id = $12 AND user_id = $13
        RETURNING *
        "#,
    )
    .bind(&item.item_type)
    .bind(&item.content)
    .bind(&item.url)
    .bind(item.date)
    .bind(&item.title)
    .bind(&item.description)
    .bind(&item.author)
    .bind(&item.site_name)
    .bind(&item.article_text)
    .bind(item.is_read)
    .bind(Utc::now())
    .bind(item.id)
    .bind(item.user_id)
    .fetch_one(pool)
    .await
}

/// Deletes an item. The ON DELETE CASCADE on `item_tags` removes associations.
pub async fn delete_item(pool: &PgPool, item_id: Uuid, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM saved_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Retrieves the tags of a single item, ordered by name.
pub async fn get_tags_for_item(pool: &PgPool, item_id: Uuid) -> Result<Vec<TagRef>> {
    sqlx::query_as::<_, TagRef>(
        r#"
        SELECT t.id, t.name
        FROM tags t
        INNER JOIN item_tags it ON t.id = it.tag_id
        WHERE it.item_id = $1
        ORDER BY t.name ASC
        "#,
    )
    .bind(item_id)
    .fetch_all(pool)
    .await
}

/// Retrieves the tags of many items in one query and groups them per item,
/// each list ordered by tag name. Items without tags are simply absent from
/// the map; callers fall back to an empty list.
pub async fn get_tags_for_items(
    pool: &PgPool,
    item_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<TagRef>>> {
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, ItemTagRow>(
        r#"
        SELECT it.item_id, t.id, t.name
        FROM item_tags it
        INNER JOIN tags t ON t.id = it.tag_id
        WHERE it.item_id = ANY($1)
        ORDER BY t.name ASC
        "#,
    )
    .bind(item_ids)
    .fetch_all(pool)
    .await?;

    let mut tags_by_item: HashMap<Uuid, Vec<TagRef>> = HashMap::new();
    for row in rows {
        tags_by_item
            .entry(row.item_id)
            .or_default()
            .push(TagRef {
                id: row.id,
                name: row.name,
            });
    }
    Ok(tags_by_item)
}

/// Associates a tag with an item. Returns 0 when the pairing already exists,
/// which the handler reports as a conflict.
pub async fn add_tag_to_item(pool: &PgPool, item_id: Uuid, tag_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        "INSERT INTO item_tags (item_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(item_id)
    .bind(tag_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Removes a tag from an item. Returns 0 when no such pairing existed, which
/// the handler reports as a distinct "not associated" outcome.
pub async fn remove_tag_from_item(pool: &PgPool, item_id: Uuid, tag_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM item_tags WHERE item_id = $1 AND tag_id = $2")
        .bind(item_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Retrieves all of a user's items carrying a given tag, newest first.
pub async fn get_items_by_tag(pool: &PgPool, tag_id: Uuid, user_id: Uuid) -> Result<Vec<SavedItem>> {
    sqlx::query_as::<_, SavedItem>(
        r#"
        SELECT si.*
        FROM saved_items si
        INNER JOIN item_tags it ON si.id = it.item_id
        WHERE it.tag_id = $1 AND si.user_id = $2
        ORDER BY si.created_at DESC
        "#,
    )
    .bind(tag_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}
