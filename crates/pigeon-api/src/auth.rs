use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::info;

use pigeon_db::Database;
use pigeon_log::MessageLog;
use pigeon_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::ApiError;
use crate::storage::UploadStore;
use crate::with_db;

/// Matches the width of the original `users.username` column.
const MAX_USERNAME_LEN: usize = 50;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub messages: MessageLog,
    /// Message attachments, served under `static/uploads/`.
    pub uploads: UploadStore,
    /// Profile pictures, served under `/static/avatars/`.
    pub avatars: UploadStore,
    pub jwt_secret: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.trim().is_empty() || req.username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "Username must be 1-{} characters",
            MAX_USERNAME_LEN
        )));
    }
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("Password must not be empty".into()));
    }

    // The UNIQUE constraint is authoritative; this only skips hashing for taken names.
    let username = req.username.clone();
    if with_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .is_some()
    {
        return Err(username_taken());
    }

    let password_hash = hash_password(&req.password)?;

    let username = req.username.clone();
    let user_id = with_db(&state, move |db| db.create_user(&username, &password_hash))
        .await?
        .ok_or_else(username_taken)?;

    info!("Registered user {} ({})", req.username, user_id);

    let token = create_token(&state.jwt_secret, user_id, &req.username)?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let user = with_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or_else(bad_credentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("Corrupt password hash for user {}: {}", user.id, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| bad_credentials())?;

    let token = create_token(&state.jwt_secret, user.id, &user.username)?;

    info!("User {} logged in", user.username);

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        avatar: user.avatar,
        token,
    }))
}

/// Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn create_token(secret: &str, user_id: i64, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn username_taken() -> ApiError {
    ApiError::Conflict("Username is already taken".into())
}

fn bad_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid username or password".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_and_verifiable() {
        let first = hash_password("hunter2").unwrap();
        let second = hash_password("hunter2").unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));

        for hash in [&first, &second] {
            let parsed = PasswordHash::new(hash).unwrap();
            assert!(Argon2::default().verify_password(b"hunter2", &parsed).is_ok());
            assert!(Argon2::default().verify_password(b"hunter3", &parsed).is_err());
        }
    }

    #[test]
    fn token_round_trips_through_middleware_decoder() {
        let token = create_token("secret", 42, "alice").unwrap();
        let claims = crate::middleware::decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "alice");

        assert!(crate::middleware::decode_token("other", &token).is_err());
    }
}
