use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Top-level service configuration, read once at startup.
///
/// Every analysis provider is optional: a missing API key disables the
/// provider and the matching pipeline stage serves its local fallback.
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub cache_ttl: Duration,
    pub auth: AuthConfig,
    pub cleaning: Option<ChatProviderConfig>,
    pub classifier: Option<ChatProviderConfig>,
    pub summarizer: Option<SummaryProviderConfig>,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// An OpenAI-compatible chat completion endpoint.
#[derive(Clone)]
pub struct ChatProviderConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

/// A hosted summarization endpoint (`{"inputs": text}` in,
/// `[{"summary_text": ...}]` out).
#[derive(Clone)]
pub struct SummaryProviderConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

const DEFAULT_CLEANING_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";
const DEFAULT_CLEANING_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_CLASSIFIER_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_CLASSIFIER_MODEL: &str = "llama-3.1-70b-versatile";
const DEFAULT_SUMMARY_URL: &str =
    "https://api-inference.huggingface.co/models/sshleifer/distilbart-cnn-12-6";

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let listen_addr: SocketAddr = env::var("VERILINE_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
            .parse()
            .context("invalid VERILINE_ADDR")?;

        let cache_ttl = parse_duration("VERILINE_CACHE_TTL_SECONDS", 300)?;
        let provider_timeout = parse_duration("VERILINE_PROVIDER_TIMEOUT_SECONDS", 20)?;

        let auth = AuthConfig {
            access_secret: env::var("VERILINE_ACCESS_SECRET")
                .context("VERILINE_ACCESS_SECRET is required")?,
            refresh_secret: env::var("VERILINE_REFRESH_SECRET")
                .context("VERILINE_REFRESH_SECRET is required")?,
            access_ttl: parse_duration("VERILINE_ACCESS_TTL_SECONDS", 900)?,
            refresh_ttl: parse_duration("VERILINE_REFRESH_TTL_SECONDS", 604_800)?,
        };

        let cleaning = env::var("CLEANING_API_KEY").ok().map(|api_key| ChatProviderConfig {
            api_url: env::var("CLEANING_API_URL")
                .unwrap_or_else(|_| DEFAULT_CLEANING_URL.to_string()),
            api_key,
            model: env::var("CLEANING_MODEL").unwrap_or_else(|_| DEFAULT_CLEANING_MODEL.to_string()),
            temperature: 0.2,
            timeout: provider_timeout,
        });

        let classifier = env::var("CLASSIFIER_API_KEY").ok().map(|api_key| ChatProviderConfig {
            api_url: env::var("CLASSIFIER_API_URL")
                .unwrap_or_else(|_| DEFAULT_CLASSIFIER_URL.to_string()),
            api_key,
            model: env::var("CLASSIFIER_MODEL")
                .unwrap_or_else(|_| DEFAULT_CLASSIFIER_MODEL.to_string()),
            temperature: 0.2,
            timeout: provider_timeout,
        });

        let summarizer = env::var("SUMMARY_API_KEY").ok().map(|api_key| SummaryProviderConfig {
            api_url: env::var("SUMMARY_API_URL")
                .unwrap_or_else(|_| DEFAULT_SUMMARY_URL.to_string()),
            api_key,
            timeout: provider_timeout,
        });

        Ok(Self {
            listen_addr,
            cache_ttl,
            auth,
            cleaning,
            classifier,
            summarizer,
        })
    }
}

fn parse_duration(env_key: &str, default_secs: u64) -> Result<Duration> {
    let raw = env::var(env_key).unwrap_or_else(|_| default_secs.to_string());
    let secs: u64 = raw
        .parse()
        .with_context(|| format!("{env_key} must be an integer number of seconds"))?;

    Ok(Duration::from_secs(secs))
}
