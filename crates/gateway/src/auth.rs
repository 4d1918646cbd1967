//! Registration and login.
//!
//! Passwords are hashed with bcrypt on the blocking pool; login has no
//! lockout.

use crate::SharedState;
use crate::error::ApiError;
use agromind_core::error::Error;
use agromind_core::farm::NewFarmer;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub farmer_id: String,
}

pub async fn register_handler(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let username = payload.username.trim().to_string();
    if username.is_empty() || payload.password.is_empty() || payload.name.trim().is_empty() {
        return Err(ApiError::validation(
            "name, username and password are required",
        ));
    }

    let password_hash = hash_password(payload.password, state.bcrypt_cost).await?;
    let farmer = state
        .store
        .create_farmer(NewFarmer {
            name: payload.name.trim().to_string(),
            username,
            password_hash,
            region: payload.region.trim().to_string(),
            language: payload.language,
        })
        .await?;

    info!(farmer_id = %farmer.id, "Farmer registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful".into(),
            farmer_id: farmer.id,
        }),
    ))
}

pub async fn login_handler(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let farmer = state
        .store
        .find_farmer_by_username(payload.username.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    if !verify_password(payload.password, farmer.password_hash).await? {
        return Err(ApiError(Error::Auth("Invalid credentials.".into())));
    }

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        farmer_id: farmer.id,
    }))
}

async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| Error::Internal(format!("hashing task: {e}")))?
        .map_err(|e| ApiError(Error::Internal(format!("bcrypt: {e}"))))
}

async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| Error::Internal(format!("verify task: {e}")))?
        .map_err(|e| ApiError(Error::Internal(format!("bcrypt: {e}"))))
}
