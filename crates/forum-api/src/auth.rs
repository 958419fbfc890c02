use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use forum_db::models::UserRow;
use forum_db::queries::NewUser;
use forum_db::{Database, DbError};
use forum_types::api::{Claims, DeleteAccountRequest, LoginRequest, LoginResponse, RegisterRequest};

use crate::error::{ApiError, FieldErrors};
use crate::permissions::Requester;
use crate::projections::user_view;
use crate::{run_db, validation};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

/// POST /auth/users/: open registration of a regular (non-staff) account.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let mut errors = FieldErrors::default();
    validation::validate_username(&mut errors, &req.username);
    validation::validate_password(&mut errors, &req.password);
    errors.finish()?;

    let user = run_db(&state, move |db| {
        if db.get_user_by_username(&req.username)?.is_some() {
            return Err(username_taken());
        }

        let password_hash = hash_password(&req.password)?;
        db.create_user(&NewUser {
            username: &req.username,
            password_hash: &password_hash,
            first_name: &req.first_name,
            last_name: &req.last_name,
            is_staff: false,
        })
        .map_err(|e| match e.downcast_ref::<DbError>() {
            // Lost a race with a concurrent registration
            Some(DbError::Duplicate) => username_taken(),
            _ => e.into(),
        })
    })
    .await?;

    info!("Registered user {} ({})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(user_view(&user))))
}

/// POST /auth/token/login/
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let user = run_db(&state, move |db| {
        let user = db.get_user_by_username(&req.username)?.ok_or_else(bad_credentials)?;
        if !verify_password(&req.password, &user.password)? {
            return Err(bad_credentials());
        }
        Ok(user)
    })
    .await?;

    let token = create_token(&state, &user)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        token,
    }))
}

/// GET /auth/users/me/
pub async fn me(State(state): State<AppState>, requester: Requester) -> Result<impl IntoResponse, ApiError> {
    let user = run_db(&state, move |db| db.get_user_by_id(requester.id)?.ok_or(ApiError::NotFound)).await?;
    Ok(Json(user_view(&user)))
}

/// POST /auth/token/logout/: every token issued to the account stops working.
pub async fn logout(State(state): State<AppState>, requester: Requester) -> Result<impl IntoResponse, ApiError> {
    run_db(&state, move |db| db.revoke_tokens(requester.id)?.ok_or(ApiError::NotFound)).await?;
    info!("User {} logged out", requester.username);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /auth/users/me/: requires the current password. Refused while the
/// account still owns themes or messages.
pub async fn delete_me(
    State(state): State<AppState>,
    requester: Requester,
    payload: Result<Json<DeleteAccountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    run_db(&state, move |db| {
        let user = db.get_user_by_id(requester.id)?.ok_or(ApiError::NotFound)?;
        if !verify_password(&req.current_password, &user.password)? {
            return Err(FieldErrors::single("current_password", "Invalid password.").into());
        }
        db.delete_user(user.id)?;
        Ok(())
    })
    .await?;

    info!("Deleted user {} ({})", requester.username, requester.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Argon2id with a random salt, PHC string output.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| anyhow::anyhow!("corrupt password hash: {}", e))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

pub fn create_token(state: &AppStateInner, user: &UserRow) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        ver: user.token_version,
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )?;

    Ok(token)
}

fn username_taken() -> ApiError {
    FieldErrors::single("username", "A user with that username already exists.").into()
}

fn bad_credentials() -> ApiError {
    FieldErrors::single("non_field_errors", "Unable to log in with provided credentials.").into()
}
