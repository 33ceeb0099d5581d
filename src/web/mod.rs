use axum::{
    Json, Router,
    extract::State,
    http::Method,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::services::auth_service;
use crate::web::{
    error::AppError,
    middleware::auth,
    models::{LoginRequest, RegisterRequest},
    routes::{item_routes, tag_routes},
};

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<ServerConfig>,
}

async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = auth_service::register_user(
        &app_state.db_pool,
        payload,
        &app_state.config.jwt_secret,
    )
    .await?;
    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let login_response =
        auth_service::login_user(&app_state.db_pool, payload, &app_state.config.jwt_secret).await?;

    let auth_cookie = Cookie::build(("token", login_response.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build();

    let mut response = Json(login_response).into_response();
    response.headers_mut().insert(
        axum::http::header::SET_COOKIE,
        auth_cookie.to_string().parse().unwrap(),
    );

    Ok(response)
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(db_pool: PgPool, config: Arc<ServerConfig>) -> Router {
    let app_state = Arc::new(AppState { db_pool, config });

    // The browser extension posts from moz-extension:// origins, so the CORS
    // layer stays permissive and auth rides on the bearer header.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route(
            "/api/auth/me",
            get(auth_service::me).route_layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                auth::auth,
            )),
        )
        .nest(
            "/api/saved-items",
            item_routes::create_items_router().route_layer(
                axum_middleware::from_fn_with_state(app_state.clone(), auth::auth),
            ),
        )
        .nest(
            "/api/tags",
            tag_routes::create_tags_router().route_layer(
                axum_middleware::from_fn_with_state(app_state.clone(), auth::auth),
            ),
        )
        .with_state(app_state)
        .layer(cors)
}
