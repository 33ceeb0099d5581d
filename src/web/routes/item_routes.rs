use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::models::{SavedItem, SavedItemWithTags};
use crate::db::services;
use crate::search::{self, SearchFields};
use crate::services::sanitize_service::sanitize_article_html;
use crate::web::models::AuthenticatedUser;
use crate::web::{AppState, error::AppError};

// --- Request/Response Structs ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[serde(rename = "type")]
    item_type: Option<String>,
    content: Option<String>,
    url: Option<String>,
    date: Option<DateTime<Utc>>,
    title: Option<String>,
    description: Option<String>,
    author: Option<String>,
    site_name: Option<String>,
    article_text: Option<String>,
}

/// Partial update: absent fields keep their stored value, while an explicit
/// JSON `null` clears a nullable field.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[serde(rename = "type")]
    item_type: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    content: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    author: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    site_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    article_text: Option<Option<String>>,
    is_read: Option<bool>,
}

/// Maps a present value (including `null`) to `Some(..)`; together with
/// `#[serde(default)]` this distinguishes an absent field from an explicit
/// null.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemTagRequest {
    tag_id: Uuid,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

#[derive(Serialize)]
pub struct ItemsResponse {
    pub items: Vec<SavedItemWithTags>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub items: Vec<SavedItemWithTags>,
    pub count: usize,
    pub query: String,
}

// --- Helpers ---

/// Attaches each item's tags (ordered by name) with a single grouped query.
/// Items with no tags get an empty list.
async fn with_tags(
    pool: &sqlx::PgPool,
    items: Vec<SavedItem>,
) -> Result<Vec<SavedItemWithTags>, AppError> {
    let item_ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
    let mut tags_by_item = services::get_tags_for_items(pool, &item_ids).await?;
    Ok(items
        .into_iter()
        .map(|item| {
            let tags = tags_by_item.remove(&item.id).unwrap_or_default();
            SavedItemWithTags { item, tags }
        })
        .collect())
}

/// Merges a partial update into the stored row: provided fields replace the
/// stored value (nulls clear nullable columns), absent fields are untouched,
/// and article HTML is sanitized on its way in.
fn apply_item_update(item: &mut SavedItem, payload: UpdateItemRequest) {
    if let Some(item_type) = payload.item_type {
        item.item_type = item_type;
    }
    if let Some(content) = payload.content {
        item.content = content;
    }
    if let Some(url) = payload.url {
        item.url = url;
    }
    if let Some(date) = payload.date {
        item.date = date;
    }
    if let Some(title) = payload.title {
        item.title = title;
    }
    if let Some(description) = payload.description {
        item.description = description;
    }
    if let Some(author) = payload.author {
        item.author = author;
    }
    if let Some(site_name) = payload.site_name {
        item.site_name = site_name;
    }
    if let Some(article_text) = payload.article_text {
        item.article_text = article_text.map(|html| sanitize_article_html(&html));
    }
    if let Some(is_read) = payload.is_read {
        item.is_read = is_read;
    }
}

// --- Route Handlers ---

async fn list_items_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ItemsResponse>, AppError> {
    let items = services::get_items_by_user(&app_state.db_pool, authenticated_user.id).await?;
    let items = with_tags(&app_state.db_pool, items).await?;
    let count = items.len();
    Ok(Json(ItemsResponse { items, count }))
}

async fn search_items_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let raw_query = params.q.unwrap_or_default();
    let terms = search::tokenize(&raw_query);
    // Reject before touching storage.
    if terms.is_empty() {
        return Err(AppError::InvalidInput("Search query is required".to_string()));
    }

    let candidates =
        services::get_items_by_user(&app_state.db_pool, authenticated_user.id).await?;

    let mut scored: Vec<(SavedItem, u64)> = candidates
        .into_iter()
        .filter_map(|item| {
            let item_score = {
                let fields = SearchFields {
                    title: item.title.as_deref(),
                    content: item.content.as_deref(),
                    description: item.description.as_deref(),
                };
                if search::qualifies(&fields, &terms) {
                    search::score(&fields, &terms)
                } else {
                    0
                }
            };
            (item_score > 0).then_some((item, item_score))
        })
        .collect();

    scored.sort_by(|(item_a, score_a), (item_b, score_b)| {
        search::cmp_ranked((*score_a, item_a.created_at), (*score_b, item_b.created_at))
    });

    let items: Vec<SavedItem> = scored.into_iter().map(|(item, _)| item).collect();
    let items = with_tags(&app_state.db_pool, items).await?;
    let count = items.len();
    Ok(Json(SearchResponse {
        items,
        count,
        query: raw_query.trim().to_string(),
    }))
}

async fn get_item_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let item = services::get_item_by_id(&app_state.db_pool, item_id, authenticated_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;
    let tags = services::get_tags_for_item(&app_state.db_pool, item.id).await?;
    Ok(Json(serde_json::json!({
        "item": SavedItemWithTags { item, tags }
    })))
}

async fn create_item_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let (Some(item_type), Some(url)) = (payload.item_type, payload.url) else {
        return Err(AppError::InvalidInput(
            "Missing required fields: type, url".to_string(),
        ));
    };

    let new_item = services::NewSavedItem {
        item_type,
        content: payload.content,
        url: Some(url),
        date: payload.date,
        title: payload.title,
        description: payload.description,
        author: payload.author,
        site_name: payload.site_name,
        article_text: payload
            .article_text
            .map(|html| sanitize_article_html(&html)),
    };

    let item = services::create_item(&app_state.db_pool, authenticated_user.id, new_item).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Item saved successfully",
            "item": item,
        })),
    ))
}

async fn update_item_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut item = services::get_item_by_id(&app_state.db_pool, item_id, authenticated_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;

    apply_item_update(&mut item, payload);

    let updated = services::update_item(&app_state.db_pool, &item).await?;
    Ok(Json(serde_json::json!({
        "message": "Item updated successfully",
        "item": updated,
    })))
}

async fn delete_item_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let rows_affected =
        services::delete_item(&app_state.db_pool, item_id, authenticated_user.id).await?;
    if rows_affected == 0 {
        return Err(AppError::NotFound("Item not found".to_string()));
    }
    Ok(Json(serde_json::json!({
        "message": "Item deleted successfully"
    })))
}

async fn add_item_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<AddItemTagRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = authenticated_user.id;

    services::get_item_by_id(&app_state.db_pool, item_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;
    services::get_tag_by_id(&app_state.db_pool, payload.tag_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    let rows_affected =
        services::add_tag_to_item(&app_state.db_pool, item_id, payload.tag_id).await?;
    if rows_affected == 0 {
        return Err(AppError::Conflict("Item already has this tag".to_string()));
    }
    Ok(Json(serde_json::json!({
        "message": "Tag added to item successfully"
    })))
}

async fn remove_item_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path((item_id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = authenticated_user.id;

    services::get_item_by_id(&app_state.db_pool, item_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;
    services::get_tag_by_id(&app_state.db_pool, tag_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    let rows_affected =
        services::remove_tag_from_item(&app_state.db_pool, item_id, tag_id).await?;
    if rows_affected == 0 {
        // Deleting a pairing that never existed is its own outcome, not a
        // silent success.
        return Err(AppError::NotFound(
            "Tag not associated with item".to_string(),
        ));
    }
    Ok(Json(serde_json::json!({
        "message": "Tag removed from item successfully"
    })))
}

// --- Router ---

pub fn create_items_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_items_handler).post(create_item_handler))
        .route("/search", get(search_items_handler))
        .route(
            "/{item_id}",
            get(get_item_handler)
                .put(update_item_handler)
                .delete(delete_item_handler),
        )
        .route("/{item_id}/tags", post(add_item_tag_handler))
        .route("/{item_id}/tags/{tag_id}", axum::routing::delete(remove_item_tag_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_item() -> SavedItem {
        let now = Utc::now();
        SavedItem {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            item_type: "article".to_string(),
            content: Some("body".to_string()),
            url: Some("https://example.com/post".to_string()),
            date: Some(now),
            title: Some("old title".to_string()),
            description: Some("a description".to_string()),
            author: Some("someone".to_string()),
            site_name: Some("example".to_string()),
            article_text: Some("<p>text</p>".to_string()),
            is_read: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let payload: UpdateItemRequest =
            serde_json::from_str(r#"{"title": null, "author": "new author"}"#).unwrap();
        let mut item = stored_item();
        apply_item_update(&mut item, payload);

        // Explicit null clears, a value replaces, absent fields keep theirs.
        assert_eq!(item.title, None);
        assert_eq!(item.author.as_deref(), Some("new author"));
        assert_eq!(item.description.as_deref(), Some("a description"));
        assert_eq!(item.item_type, "article");
    }

    #[test]
    fn update_sanitizes_provided_article_text() {
        let payload: UpdateItemRequest =
            serde_json::from_str(r#"{"articleText": "<div><p>kept</p><script>no</script></div>"}"#)
                .unwrap();
        let mut item = stored_item();
        apply_item_update(&mut item, payload);

        assert_eq!(item.article_text.as_deref(), Some("<p>kept</p>"));
    }

    #[test]
    fn update_toggles_read_flag_only_when_provided() {
        let payload: UpdateItemRequest = serde_json::from_str(r#"{"isRead": true}"#).unwrap();
        let mut item = stored_item();
        apply_item_update(&mut item, payload);
        assert!(item.is_read);

        let untouched: UpdateItemRequest = serde_json::from_str("{}").unwrap();
        apply_item_update(&mut item, untouched);
        assert!(item.is_read);
    }
}
