use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use swapmeet_db::Database;
use swapmeet_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use swapmeet_types::models::UserInfo;

use crate::{ApiError, blocking};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: impl Into<String>) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret: jwt_secret.into(),
        })
    }
}

/// Tokens stay valid for 30 days.
const TOKEN_TTL_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::Validation(
            "Username must be between 3 and 32 characters".into(),
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let user_id = Uuid::new_v4();
    let db_state = state.clone();
    let (name, mail) = (username.clone(), email.clone());
    blocking(move || {
        let db = &db_state.db;
        if db.get_user_by_username(&name)?.is_some() || db.get_user_by_email(&mail)?.is_some() {
            return Err(ApiError::Conflict("User already exists".into()));
        }

        let password_hash = hash_password(&req.password)?;
        db.create_user(&user_id.to_string(), &name, &mail, &password_hash)?;
        Ok(())
    })
    .await?;

    info!("Registered user {}", username);

    let token = create_token(&state.jwt_secret, user_id, &username)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: UserInfo {
                id: user_id.to_string(),
                username,
                email: Some(email),
            },
        }),
    ))
}

/// Accepts either the username or the email in the `username` field.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let db_state = state.clone();
    let user = blocking(move || {
        let db = &db_state.db;
        let login = req.username.trim();
        let user = match db.get_user_by_username(login)? {
            Some(user) => Some(user),
            None => db.get_user_by_email(&login.to_lowercase())?,
        }
        .ok_or(ApiError::InvalidCredentials)?;

        verify_password(&req.password, &user.password)?;
        Ok(user)
    })
    .await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: UserInfo {
            id: user.id,
            username: user.username,
            email: Some(user.email),
        },
    }))
}

/// Hash a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored_hash: &str) -> Result<(), ApiError> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt password hash: {}", e)))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
