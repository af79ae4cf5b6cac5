// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Cleaning stage: normalize raw text before analysis.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::agents::StageAgent;
use crate::model::CleaningResult;
use crate::upstream::ChatCompletion;

pub struct CleaningAgent {
    provider: Option<Arc<dyn ChatCompletion>>,
}

impl CleaningAgent {
    pub fn new(provider: Option<Arc<dyn ChatCompletion>>) -> Self {
        Self { provider }
    }
}

fn cleaning_prompt(text: &str) -> String {
    format!(
        "Clean and normalize the following text for security analysis.\n\
         - Remove obvious signatures, greetings, and repeated whitespace.\n\
         - Keep URLs and email addresses.\n\
         - Return ONLY the cleaned text, no explanations.\n\nText:\n{text}"
    )
}

#[async_trait]
impl StageAgent for CleaningAgent {
    type Output = CleaningResult;

    fn stage(&self) -> &'static str {
        "cleaning"
    }

    async fn attempt(&self, input: &str) -> Result<CleaningResult> {
        let provider = self
            .provider
            .as_ref()
            .context("cleaning provider not configured")?;

        let cleaned = provider.complete(&cleaning_prompt(input)).await?;
        let cleaned = cleaned.trim();

        // An empty model answer is not a usable cleaning result; keep the
        // original text instead.
        let cleaned_text = if cleaned.is_empty() {
            input.to_string()
        } else {
            cleaned.to_string()
        };

        Ok(CleaningResult {
            original_length: input.chars().count(),
            cleaned_length: cleaned_text.chars().count(),
            cleaned_text,
        })
    }

    fn fallback(&self, input: &str) -> CleaningResult {
        let trimmed = input.trim();
        CleaningResult {
            cleaned_text: trimmed.to_string(),
            original_length: input.chars().count(),
            cleaned_length: trimmed.chars().count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use crate::model::StageOrigin;
    use crate::upstream::MockChatCompletion;
    use std::time::Duration;

    fn cache() -> ResultCache {
        ResultCache::new(Duration::from_secs(300))
    }

    #[tokio::test]
    async fn missing_provider_degrades_to_trimmed_input() {
        let agent = CleaningAgent::new(None);

        let output = agent.run(&cache(), "  hello world  ").await;

        assert_eq!(output.origin, StageOrigin::Fallback);
        assert_eq!(output.value.cleaned_text, "hello world");
        assert_eq!(output.value.original_length, 15);
        assert_eq!(output.value.cleaned_length, 11);
    }

    #[tokio::test]
    async fn provider_output_is_used_when_present() {
        let mut provider = MockChatCompletion::new();
        provider
            .expect_complete()
            .returning(|_| Ok("cleaned body".to_string()));

        let agent = CleaningAgent::new(Some(Arc::new(provider)));
        let output = agent.run(&cache(), "Hi!\n\ncleaned body\n\nregards").await;

        assert_eq!(output.origin, StageOrigin::Provider);
        assert_eq!(output.value.cleaned_text, "cleaned body");
        assert_eq!(output.value.cleaned_length, 12);
    }

    #[tokio::test]
    async fn empty_provider_output_keeps_original_text() {
        let mut provider = MockChatCompletion::new();
        provider.expect_complete().returning(|_| Ok("   ".to_string()));

        let agent = CleaningAgent::new(Some(Arc::new(provider)));
        let output = agent.run(&cache(), "original text").await;

        assert_eq!(output.origin, StageOrigin::Provider);
        assert_eq!(output.value.cleaned_text, "original text");
    }

    #[tokio::test]
    async fn provider_error_degrades_to_trimmed_input() {
        let mut provider = MockChatCompletion::new();
        provider
            .expect_complete()
            .returning(|_| Err(anyhow::anyhow!("timeout")));

        let agent = CleaningAgent::new(Some(Arc::new(provider)));
        let output = agent.run(&cache(), " text ").await;

        assert_eq!(output.origin, StageOrigin::Fallback);
        assert_eq!(output.value.cleaned_text, "text");
    }
}
