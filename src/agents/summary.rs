// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Summary stage: condense the cleaned text via a hosted summarization
//! endpoint.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::agents::StageAgent;
use crate::model::{truncate_chars, SummaryResult};
use crate::upstream::Summarize;

/// Length of the truncation used both when the provider answers without a
/// summary and when it fails outright; the two cases are indistinguishable
/// downstream apart from the provenance flag.
const TRUNCATED_SUMMARY_CHARS: usize = 280;

pub struct SummaryAgent {
    provider: Option<Arc<dyn Summarize>>,
}

impl SummaryAgent {
    pub fn new(provider: Option<Arc<dyn Summarize>>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl StageAgent for SummaryAgent {
    type Output = SummaryResult;

    fn stage(&self) -> &'static str {
        "summary"
    }

    async fn attempt(&self, input: &str) -> Result<SummaryResult> {
        let provider = self
            .provider
            .as_ref()
            .context("summary provider not configured")?;

        let summary = provider
            .summarize(input)
            .await?
            .unwrap_or_else(|| truncate_chars(input, TRUNCATED_SUMMARY_CHARS));

        Ok(SummaryResult { summary })
    }

    fn fallback(&self, input: &str) -> SummaryResult {
        SummaryResult {
            summary: truncate_chars(input, TRUNCATED_SUMMARY_CHARS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use crate::model::StageOrigin;
    use crate::upstream::MockSummarize;
    use std::time::Duration;

    fn cache() -> ResultCache {
        ResultCache::new(Duration::from_secs(300))
    }

    #[tokio::test]
    async fn provider_summary_is_used() {
        let mut provider = MockSummarize::new();
        provider
            .expect_summarize()
            .returning(|_| Ok(Some("a short digest".to_string())));

        let agent = SummaryAgent::new(Some(Arc::new(provider)));
        let output = agent.run(&cache(), "a very long body of text").await;

        assert_eq!(output.origin, StageOrigin::Provider);
        assert_eq!(output.value.summary, "a short digest");
    }

    #[tokio::test]
    async fn empty_provider_answer_truncates_but_counts_as_provider() {
        let mut provider = MockSummarize::new();
        provider.expect_summarize().returning(|_| Ok(None));

        let long = "z".repeat(400);
        let agent = SummaryAgent::new(Some(Arc::new(provider)));
        let output = agent.run(&cache(), &long).await;

        assert_eq!(output.origin, StageOrigin::Provider);
        assert_eq!(output.value.summary, "z".repeat(280));
    }

    #[tokio::test]
    async fn missing_provider_truncates_input() {
        let agent = SummaryAgent::new(None);
        let long = "y".repeat(300);
        let output = agent.run(&cache(), &long).await;

        assert_eq!(output.origin, StageOrigin::Fallback);
        assert_eq!(output.value.summary, "y".repeat(280));
        assert!(!output.value.summary.ends_with('…'));
    }

    #[tokio::test]
    async fn short_input_passes_through_unchanged() {
        let agent = SummaryAgent::new(None);
        let output = agent.run(&cache(), "short note").await;
        assert_eq!(output.value.summary, "short note");
    }

    #[tokio::test]
    async fn provider_error_degrades_to_truncation() {
        let mut provider = MockSummarize::new();
        provider
            .expect_summarize()
            .returning(|_| Err(anyhow::anyhow!("503 service unavailable")));

        let agent = SummaryAgent::new(Some(Arc::new(provider)));
        let output = agent.run(&cache(), "some text").await;

        assert_eq!(output.origin, StageOrigin::Fallback);
        assert_eq!(output.value.summary, "some text");
    }
}
