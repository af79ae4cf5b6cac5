// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! HTTP API for the analysis service.
//!
//! - `GET  /healthz` - service health check
//! - `GET  /metrics` - Prometheus metrics export
//! - `POST /api/auth/register`, `/login`, `/refresh`, `/logout`
//! - `POST /api/scans/analyze` - run the pipeline and persist a scan
//! - `GET  /api/scans`, `PATCH /api/scans/:id`, `DELETE /api/scans/:id`
//! - `POST /api/spam/check`, `GET /api/spam/history`
//!
//! A degraded pipeline still answers 200 with a fallback-based report; only
//! validation, auth, and persistence problems produce error responses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::analysis::AnalysisService;
use crate::auth::{self, AuthUser};
use crate::config::AuthConfig;
use crate::error::AppError;
use crate::metrics::Metrics;
use crate::model::{
    truncate_chars, AnalyzeRequest, AnalyzeResponse, AuthResponse, ContentLabel, LoginRequest,
    LogoutRequest, RefreshRequest, RegisterRequest, ScanPatch, ScanRecord, ScanStatus,
    SpamCheckRecord, SpamCheckRequest, SpamVerdict, User, UserRole,
};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub analysis: AnalysisService,
    pub store: Store,
    pub auth: AuthConfig,
    pub metrics: Metrics,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(export_metrics))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/scans/analyze", post(analyze))
        .route("/api/scans", get(list_scans))
        .route("/api/scans/:id", patch(edit_scan).delete(remove_scan))
        .route("/api/spam/check", post(spam_check))
        .route("/api/spam/history", get(spam_history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "veriline",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn export_metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state.metrics.export()
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    if request.email.trim().is_empty() {
        return Err(AppError::bad_request("email is required"));
    }
    if request.password.is_empty() {
        return Err(AppError::bad_request("password is required"));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: request.name.trim().to_string(),
        email: request.email.trim().to_lowercase(),
        password_digest: auth::hash_password(&request.password),
        role: UserRole::User,
        created_at: Utc::now(),
        last_login_at: None,
        refresh_tokens: Vec::new(),
    };

    let user = state.store.insert_user(user).await?;
    let (response, user) = auth::issue_token_pair(&state.auth, user)?;
    state.store.update_user(user).await?;

    Ok(Json(response))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let mut user = state
        .store
        .find_user_by_email(request.email.trim())
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    if !auth::verify_password(&request.password, &user.password_digest) {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    user.last_login_at = Some(Utc::now());
    let (response, user) = auth::issue_token_pair(&state.auth, user)?;
    state.store.update_user(user).await?;

    Ok(Json(response))
}

async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let claims = auth::verify_token(&request.refresh_token, &state.auth.refresh_secret)?;

    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .filter(|user| user.refresh_tokens.contains(&request.refresh_token))
        .ok_or_else(|| AppError::unauthorized("invalid refresh token"))?;

    let (response, user) = auth::issue_token_pair(&state.auth, user)?;
    state.store.update_user(user).await?;

    Ok(Json(response))
}

async fn logout(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    Json(request): Json<LogoutRequest>,
) -> Result<StatusCode, AppError> {
    user.refresh_tokens
        .retain(|token| token != &request.refresh_token);
    state.store.update_user(user).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn analyze(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if request.payload.trim().is_empty() {
        return Err(AppError::bad_request("payload is required"));
    }

    let analysis = state.analysis.process(&request.payload).await;

    let now = Utc::now();
    let scan = ScanRecord {
        id: Uuid::new_v4().to_string(),
        user_id: user.id,
        title: request.title.unwrap_or_else(|| "Untitled Scan".to_string()),
        kind: request.kind,
        status: ScanStatus::Completed,
        input_summary: truncate_chars(&request.payload, 150),
        findings: Vec::new(),
        score: analysis.report.risk_score,
        tags: vec![analysis.report.overall_label.to_string()],
        created_at: now,
        updated_at: now,
    };
    let scan = state.store.insert_scan(scan).await?;

    Ok(Json(AnalyzeResponse { scan, analysis }))
}

async fn list_scans(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ScanRecord>>, AppError> {
    Ok(Json(state.store.list_scans(&user.id).await?))
}

async fn edit_scan(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(scan_id): Path<String>,
    Json(patch): Json<ScanPatch>,
) -> Result<Json<ScanRecord>, AppError> {
    let updated = state.store.update_scan(&user.id, &scan_id, patch).await?;
    Ok(Json(updated))
}

async fn remove_scan(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(scan_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete_scan(&user.id, &scan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn spam_verdict(label: ContentLabel) -> SpamVerdict {
    match label {
        ContentLabel::Phishing | ContentLabel::Spam => SpamVerdict::Spam,
        ContentLabel::DarkPattern => SpamVerdict::Suspicious,
        ContentLabel::Legitimate | ContentLabel::Unknown => SpamVerdict::Clean,
    }
}

async fn spam_check(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<SpamCheckRequest>,
) -> Result<Json<SpamCheckRecord>, AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::bad_request("content is required"));
    }

    let classification = state.analysis.classify(&request.content).await;

    let record = SpamCheckRecord {
        id: Uuid::new_v4().to_string(),
        user_id: user.id,
        content_sample: truncate_chars(&request.content, 200),
        risk_score: classification.value.confidence,
        verdict: spam_verdict(classification.value.label),
        classification: classification.value,
        metadata: request.metadata,
        created_at: Utc::now(),
    };
    let record = state.store.insert_spam_check(record).await?;

    Ok(Json(record))
}

async fn spam_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<SpamCheckRecord>>, AppError> {
    Ok(Json(state.store.list_spam_checks(&user.id).await?))
}
