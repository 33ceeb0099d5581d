use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents a user account.
/// Corresponds to the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents an article or highlight saved from the browser extension.
/// Corresponds to the `saved_items` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub item_type: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub site_name: Option<String>,
    pub article_text: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents a user-defined tag.
/// Corresponds to the `tags` table. Names are unique per user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color1: String,
    pub color2: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal tag payload attached to items in list/search responses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TagRef {
    pub id: Uuid,
    pub name: String,
}

/// A saved item together with its tags, ordered by tag name.
/// Items with no tags carry an empty list, never null.
#[derive(Debug, Clone, Serialize)]
pub struct SavedItemWithTags {
    #[serde(flatten)]
    pub item: SavedItem,
    pub tags: Vec<TagRef>,
}
