// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Data models for the analysis pipeline and the REST surface.
//!
//! Pipeline results are created once per run and immutable afterwards;
//! the only mutable shared state in the service is the result cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed tag set a classified submission can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentLabel {
    Phishing,
    Spam,
    DarkPattern,
    Legitimate,
    Unknown,
}

impl fmt::Display for ContentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentLabel::Phishing => "phishing",
            ContentLabel::Spam => "spam",
            ContentLabel::DarkPattern => "dark-pattern",
            ContentLabel::Legitimate => "legitimate",
            ContentLabel::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningResult {
    pub cleaned_text: String,
    pub original_length: usize,
    pub cleaned_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: ContentLabel,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Url,
    Email,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub urls: Vec<String>,
    pub emails: Vec<String>,
    pub entities: Vec<Entity>,
    pub indicators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub content: String,
}

/// Derived per run, never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    pub risk_score: f64,
    pub overall_label: ContentLabel,
    pub sections: Vec<ReportSection>,
}

/// Where a stage result came from: the real provider (or the stage's own
/// local analysis), or the deterministic fallback used when the provider
/// was unreachable or returned garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOrigin {
    Provider,
    Fallback,
}

/// A stage result plus its provenance. Cached entries keep the origin they
/// were stored with, so a degraded result stays recognizable on a hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput<T> {
    pub value: T,
    pub origin: StageOrigin,
}

impl<T> StageOutput<T> {
    pub fn provider(value: T) -> Self {
        Self {
            value,
            origin: StageOrigin::Provider,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            origin: StageOrigin::Fallback,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.origin == StageOrigin::Fallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProvenance {
    pub cleaning: StageOrigin,
    pub classification: StageOrigin,
    pub extraction: StageOrigin,
    pub summary: StageOrigin,
}

/// Full pipeline output: the unit cached by the analysis service and
/// returned to HTTP callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratedAnalysisResult {
    pub cleaning: CleaningResult,
    pub classification: ClassificationResult,
    pub extraction: ExtractionResult,
    pub summary: SummaryResult,
    pub report: ReportResult,
    pub provenance: StageProvenance,
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_digest: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub refresh_tokens: Vec<String>,
}

/// Wire-safe view of a user (no credential material).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    #[default]
    Text,
    Email,
    Image,
    Website,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub risk_level: RiskLevel,
    pub description: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub kind: ScanKind,
    pub status: ScanStatus,
    pub input_summary: String,
    pub findings: Vec<Finding>,
    pub score: f64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpamVerdict {
    Spam,
    Suspicious,
    Clean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamCheckRecord {
    pub id: String,
    pub user_id: String,
    pub content_sample: String,
    pub risk_score: f64,
    pub verdict: SpamVerdict,
    pub classification: ClassificationResult,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Request / response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub payload: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub kind: ScanKind,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub scan: ScanRecord,
    pub analysis: OrchestratedAnalysisResult,
}

#[derive(Debug, Deserialize)]
pub struct ScanPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<ScanStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SpamCheckRequest {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Truncate to at most `max` characters on a char boundary. No ellipsis.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_label_serializes_kebab_case() {
        let json = serde_json::to_string(&ContentLabel::DarkPattern).expect("serialize");
        assert_eq!(json, "\"dark-pattern\"");
        assert_eq!(ContentLabel::DarkPattern.to_string(), "dark-pattern");
    }

    #[test]
    fn entity_kind_uses_type_field() {
        let entity = Entity {
            kind: EntityKind::Url,
            value: "https://example.com".to_string(),
        };
        let json = serde_json::to_value(&entity).expect("serialize");
        assert_eq!(json["type"], "url");
    }

    #[test]
    fn truncate_is_char_boundary_safe() {
        let text = "héllo wörld";
        assert_eq!(truncate_chars(text, 4), "héll");
        assert_eq!(truncate_chars("short", 280), "short");
        assert!(!truncate_chars(&"x".repeat(400), 280).ends_with('…'));
        assert_eq!(truncate_chars(&"x".repeat(400), 280).len(), 280);
    }

    #[test]
    fn user_profile_drops_credentials() {
        let user = User {
            id: "u1".to_string(),
            name: "Test".to_string(),
            email: "t@example.com".to_string(),
            password_digest: "salt$digest".to_string(),
            role: UserRole::User,
            created_at: Utc::now(),
            last_login_at: None,
            refresh_tokens: vec!["token".to_string()],
        };

        let profile = UserProfile::from(&user);
        let json = serde_json::to_value(&profile).expect("serialize");
        assert!(json.get("password_digest").is_none());
        assert!(json.get("refresh_tokens").is_none());
    }
}
