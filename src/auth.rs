// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Authentication: password digests, JWT issuance/validation, and the
//! bearer-token request extractor.
//!
//! Access and refresh tokens are HS256 JWTs signed with separate secrets.
//! Refresh tokens are additionally stored on the user record so they can be
//! revoked server-side.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

use crate::api::AppState;
use crate::config::AuthConfig;
use crate::error::AppError;
use crate::model::{AuthResponse, User, UserProfile};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

pub fn issue_token(user_id: &str, secret: &str, ttl: Duration) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl.as_secs() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| AppError::unauthorized(format!("invalid token: {e}")))?;

    Ok(token_data.claims)
}

/// Issue a fresh access/refresh pair and record the refresh token on the
/// user so it can be revoked later. Returns the updated user for storage.
pub fn issue_token_pair(auth: &AuthConfig, mut user: User) -> Result<(AuthResponse, User), AppError> {
    let access_token = issue_token(&user.id, &auth.access_secret, auth.access_ttl)?;
    let refresh_token = issue_token(&user.id, &auth.refresh_secret, auth.refresh_ttl)?;

    user.refresh_tokens.push(refresh_token.clone());

    let response = AuthResponse {
        user: UserProfile::from(&user),
        access_token,
        refresh_token,
    };

    Ok((response, user))
}

pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest_with_salt(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest_with_salt(salt, password) == expected,
        None => false,
    }
}

fn digest_with_salt(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Authenticated user, resolved from the `Authorization: Bearer` header.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("authorization header missing"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("invalid authorization header"))?;

        let claims = verify_token(token, &state.auth.access_secret)?;

        let user = state
            .store
            .find_user(&claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("user not found"))?;

        Ok(AuthUser(user))
    }
}
