use axum::Extension;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sqlx::PgPool;

use crate::db::models::User;
use crate::db::services as db_services;
use crate::web::error::AppError;
use crate::web::models::{AuthResponse, AuthenticatedUser, Claims, LoginRequest, RegisterRequest, UserResponse};

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        _ => false,
    }
}

pub async fn register_user(
    pool: &PgPool,
    req: RegisterRequest,
    jwt_secret: &str,
) -> Result<AuthResponse, AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::InvalidInput("Username is required".to_string()));
    }
    if !is_plausible_email(&req.email) {
        return Err(AppError::InvalidInput("Invalid email format".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    let existing_user =
        db_services::get_user_by_username_or_email(pool, &req.username, &req.email).await?;
    if existing_user.is_some() {
        return Err(AppError::UserAlreadyExists(
            "User with this email or username already exists".to_string(),
        ));
    }

    let password_hash = hash(&req.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let user = db_services::create_user(pool, req.username.trim(), &req.email, &password_hash).await?;

    let token = create_jwt_for_user(&user, jwt_secret)?;
    Ok(auth_response("User registered successfully", &user, token))
}

pub async fn login_user(
    pool: &PgPool,
    req: LoginRequest,
    jwt_secret: &str,
) -> Result<AuthResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required".to_string(),
        ));
    }

    // A missing user and a wrong password are indistinguishable to the caller.
    let user = match db_services::get_user_by_email(pool, &req.email).await? {
        Some(user) => user,
        None => return Err(AppError::InvalidCredentials),
    };

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    let token = create_jwt_for_user(&user, jwt_secret)?;
    Ok(auth_response("Login successful", &user, token))
}

pub fn create_jwt_for_user(user: &User, jwt_secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    // Tokens stay valid for 7 days, matching the extension's session length.
    let expiration = (now + Duration::days(7)).timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))
}

fn auth_response(message: &str, user: &User, token: String) -> AuthResponse {
    AuthResponse {
        message: message.to_string(),
        user: UserResponse {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        },
        token,
    }
}

pub async fn me(
    axum::extract::State(state): axum::extract::State<std::sync::Arc<crate::web::AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    let user = db_services::get_user_by_id(&state.db_pool, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(axum::Json(serde_json::json!({
        "user": UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};
    use uuid::Uuid;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            password_hash: "irrelevant".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let user = sample_user();
        let token = create_jwt_for_user(&user, "test-secret").unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.user_id, user.id);
        assert_eq!(data.claims.sub, user.email);
    }

    #[test]
    fn email_plausibility_checks() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("not-an-email"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("a@b@c.com"));
    }
}
