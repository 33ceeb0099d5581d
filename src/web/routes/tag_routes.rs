use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::models::Tag;
use crate::db::services;
use crate::web::models::AuthenticatedUser;
use crate::web::{AppState, error::AppError};
use crate::web::error::is_unique_violation;

const DEFAULT_COLOR1: &str = "#1e7ea5";
const DEFAULT_COLOR2: &str = "#17416e";

// --- Request/Response Structs ---

#[derive(Deserialize)]
pub struct CreateTagRequest {
    name: Option<String>,
    color1: Option<String>,
    color2: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTagRequest {
    name: Option<String>,
    color1: Option<String>,
    color2: Option<String>,
}

// --- Route Handlers ---

async fn create_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let user_id = authenticated_user.id;
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Tag name is required".to_string()))?
        .to_string();

    if services::find_tag_by_name(&app_state.db_pool, user_id, &name, None)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Tag already exists".to_string()));
    }

    let tag = services::create_tag(
        &app_state.db_pool,
        user_id,
        &name,
        payload.color1.as_deref().unwrap_or(DEFAULT_COLOR1),
        payload.color2.as_deref().unwrap_or(DEFAULT_COLOR2),
    )
    .await
    .map_err(|err| {
        // The unique index backstops the pre-check under concurrent creates.
        if is_unique_violation(&err) {
            AppError::Conflict("Tag already exists".to_string())
        } else {
            AppError::from(err)
        }
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "tag": tag }))))
}

async fn get_user_tags_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tags: Vec<Tag> =
        services::get_tags_by_user(&app_state.db_pool, authenticated_user.id).await?;
    Ok(Json(serde_json::json!({ "tags": tags })))
}

async fn get_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tag = services::get_tag_by_id(&app_state.db_pool, tag_id, authenticated_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;
    Ok(Json(serde_json::json!({ "tag": tag })))
}

async fn update_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<Uuid>,
    Json(payload): Json<UpdateTagRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = authenticated_user.id;
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Tag name is required".to_string()))?
        .to_string();

    let existing = services::get_tag_by_id(&app_state.db_pool, tag_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    if services::find_tag_by_name(&app_state.db_pool, user_id, &name, Some(tag_id))
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Tag name already exists".to_string()));
    }

    let updated = services::update_tag(
        &app_state.db_pool,
        tag_id,
        user_id,
        &name,
        payload.color1.as_deref().unwrap_or(&existing.color1),
        payload.color2.as_deref().unwrap_or(&existing.color2),
    )
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            AppError::Conflict("Tag name already exists".to_string())
        } else {
            AppError::from(err)
        }
    })?
    .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    Ok(Json(serde_json::json!({ "tag": updated })))
}

async fn delete_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let rows_affected =
        services::delete_tag(&app_state.db_pool, tag_id, authenticated_user.id).await?;
    if rows_affected == 0 {
        return Err(AppError::NotFound("Tag not found".to_string()));
    }
    Ok(Json(serde_json::json!({
        "message": "Tag deleted successfully"
    })))
}

async fn get_items_by_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = authenticated_user.id;
    services::get_tag_by_id(&app_state.db_pool, tag_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    let items = services::get_items_by_tag(&app_state.db_pool, tag_id, user_id).await?;
    Ok(Json(serde_json::json!({ "items": items })))
}

// --- Router ---

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_user_tags_handler).post(create_tag_handler))
        .route(
            "/{tag_id}",
            get(get_tag_handler)
                .put(update_tag_handler)
                .delete(delete_tag_handler),
        )
        .route("/{tag_id}/items", get(get_items_by_tag_handler))
}
