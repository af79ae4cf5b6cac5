// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! HTTP clients for the external AI providers.
//!
//! Three outbound boundaries: a chat/generation endpoint used by the
//! cleaning stage, a chat completion endpoint used by the classification
//! stage, and a hosted summarization endpoint. Each client carries its own
//! timeout; a timed-out call surfaces as an ordinary provider error and the
//! calling stage falls back. Credentials are optional service-wide, so
//! construction happens only when a key is configured.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{ChatProviderConfig, SummaryProviderConfig};
use crate::error::AppError;

/// A provider that answers a single-turn prompt with plain text.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// A provider that condenses text, returning `None` when the response
/// carries no usable summary.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<Option<String>>;
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

impl ChatClient {
    pub fn try_new(config: &ChatProviderConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow!("Failed to build chat client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatCompletion for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("chat request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("chat endpoint returned {status}");
        }

        let payload: ChatResponse = response
            .json()
            .await
            .context("failed to parse chat response")?;

        Ok(payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[derive(Clone)]
pub struct SummaryClient {
    client: Client,
    api_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct SummaryRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
struct SummaryEntry {
    #[serde(default)]
    summary_text: Option<String>,
}

impl SummaryClient {
    pub fn try_new(config: &SummaryProviderConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow!("Failed to build summary client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Summarize for SummaryClient {
    async fn summarize(&self, text: &str) -> Result<Option<String>> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&SummaryRequest { inputs: text })
            .send()
            .await
            .context("summary request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("summary endpoint returned {status}");
        }

        let payload: Vec<SummaryEntry> = response
            .json()
            .await
            .context("failed to parse summary response")?;

        Ok(payload.into_iter().next().and_then(|entry| entry.summary_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_reads_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).expect("parse");
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        assert_eq!(content, "hello");
    }

    #[test]
    fn chat_response_tolerates_missing_choices() {
        let parsed: ChatResponse = serde_json::from_str("{}").expect("parse");
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn summary_entry_field_is_optional() {
        let with: Vec<SummaryEntry> =
            serde_json::from_str(r#"[{"summary_text":"tl;dr"}]"#).expect("parse");
        assert_eq!(with[0].summary_text.as_deref(), Some("tl;dr"));

        let without: Vec<SummaryEntry> = serde_json::from_str(r#"[{}]"#).expect("parse");
        assert!(without[0].summary_text.is_none());
    }
}
