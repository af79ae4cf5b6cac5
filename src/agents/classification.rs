// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Classification stage: label content as phishing, spam, dark-pattern,
//! legitimate, or unknown via a chat completion endpoint.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::agents::StageAgent;
use crate::model::{ClassificationResult, ContentLabel};
use crate::upstream::ChatCompletion;

/// Confidence assumed when the model returns valid JSON without a numeric
/// confidence field.
const DEFAULT_CONFIDENCE: f64 = 0.6;

pub const FALLBACK_REASON: &str = "Model unavailable; using heuristic fallback.";

pub struct ClassificationAgent {
    provider: Option<Arc<dyn ChatCompletion>>,
}

impl ClassificationAgent {
    pub fn new(provider: Option<Arc<dyn ChatCompletion>>) -> Self {
        Self { provider }
    }
}

fn classification_prompt(text: &str) -> String {
    format!(
        "Classify the following content into one of:\n\
         - phishing\n\
         - spam\n\
         - dark-pattern\n\
         - legitimate\n\n\
         Respond in JSON with:\n\
         {{ \"label\": \"...\", \"confidence\": 0-1, \"reasons\": [\"...\"] }}\n\n\
         Content:\n{text}"
    )
}

/// Lenient label matching: lowercase substring containment, first match
/// wins in this priority order.
fn parse_label(raw: &str) -> ContentLabel {
    let normalized = raw.to_lowercase();
    if normalized.contains("phishing") {
        ContentLabel::Phishing
    } else if normalized.contains("spam") {
        ContentLabel::Spam
    } else if normalized.contains("dark") {
        ContentLabel::DarkPattern
    } else if normalized.contains("legit") {
        ContentLabel::Legitimate
    } else {
        ContentLabel::Unknown
    }
}

/// Tolerant parse of a model response that should be a JSON object with
/// `label`, `confidence`, and `reasons`. Malformed JSON is a provider
/// failure; valid JSON with fields of the wrong shape gets defaults.
fn parse_response(content: &str) -> Result<ClassificationResult> {
    let parsed: Value =
        serde_json::from_str(content).context("classification response was not valid JSON")?;

    let label = parse_label(parsed.get("label").and_then(Value::as_str).unwrap_or(""));
    let confidence = parsed
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_CONFIDENCE);
    let reasons = parsed
        .get("reasons")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    Ok(ClassificationResult {
        label,
        confidence,
        reasons,
    })
}

#[async_trait]
impl StageAgent for ClassificationAgent {
    type Output = ClassificationResult;

    fn stage(&self) -> &'static str {
        "classification"
    }

    async fn attempt(&self, input: &str) -> Result<ClassificationResult> {
        let provider = self
            .provider
            .as_ref()
            .context("classification provider not configured")?;

        let content = provider.complete(&classification_prompt(input)).await?;
        parse_response(&content)
    }

    fn fallback(&self, _input: &str) -> ClassificationResult {
        ClassificationResult {
            label: ContentLabel::Unknown,
            confidence: 0.3,
            reasons: vec![FALLBACK_REASON.to_string()],
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

    #[test]
    fn label_matching_is_lenient_and_ordered() {
        assert_eq!(parse_label("Phishing attempt"), ContentLabel::Phishing);
        assert_eq!(parse_label("SPAM"), ContentLabel::Spam);
        assert_eq!(parse_label("dark patterns detected"), ContentLabel::DarkPattern);
        assert_eq!(parse_label("legitimate"), ContentLabel::Legitimate);
        assert_eq!(parse_label("legit"), ContentLabel::Legitimate);
        assert_eq!(parse_label("benign"), ContentLabel::Unknown);
        assert_eq!(parse_label(""), ContentLabel::Unknown);
        // "phishing" outranks "spam" when both appear
        assert_eq!(parse_label("spam or phishing"), ContentLabel::Phishing);
    }

    #[test]
    fn valid_response_parses_all_fields() {
        let result = parse_response(
            r#"{"label":"phishing","confidence":0.92,"reasons":["spoofed sender","urgency"]}"#,
        )
        .expect("parse");

        assert_eq!(result.label, ContentLabel::Phishing);
        assert!((result.confidence - 0.92).abs() < 1e-9);
        assert_eq!(result.reasons, vec!["spoofed sender", "urgency"]);
    }

    #[test]
    fn non_numeric_confidence_defaults() {
        let result =
            parse_response(r#"{"label":"spam","confidence":"high","reasons":[]}"#).expect("parse");
        assert!((result.confidence - DEFAULT_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn non_array_reasons_default_to_empty() {
        let result =
            parse_response(r#"{"label":"spam","confidence":0.7,"reasons":"because"}"#).expect("parse");
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_response("the content is spam").is_err());
        assert!(parse_response("").is_err());
    }

    #[tokio::test]
    async fn unreachable_provider_yields_deterministic_fallback() {
        let agent = ClassificationAgent::new(None);
        let output = agent.run(&cache(), "anything").await;

        assert_eq!(output.origin, StageOrigin::Fallback);
        assert_eq!(output.value.label, ContentLabel::Unknown);
        assert!((output.value.confidence - 0.3).abs() < 1e-9);
        assert_eq!(output.value.reasons, vec![FALLBACK_REASON.to_string()]);
    }

    #[tokio::test]
    async fn provider_json_is_classified() {
        let mut provider = MockChatCompletion::new();
        provider.expect_complete().returning(|_| {
            Ok(r#"{"label":"dark-pattern","confidence":0.85,"reasons":["forced continuity"]}"#
                .to_string())
        });

        let agent = ClassificationAgent::new(Some(Arc::new(provider)));
        let output = agent.run(&cache(), "subscribe now, cancel never").await;

        assert_eq!(output.origin, StageOrigin::Provider);
        assert_eq!(output.value.label, ContentLabel::DarkPattern);
    }

    #[tokio::test]
    async fn malformed_provider_json_degrades() {
        let mut provider = MockChatCompletion::new();
        provider
            .expect_complete()
            .returning(|_| Ok("Sure! Here is my analysis: spam.".to_string()));

        let agent = ClassificationAgent::new(Some(Arc::new(provider)));
        let output = agent.run(&cache(), "text").await;

        assert_eq!(output.origin, StageOrigin::Fallback);
        assert_eq!(output.value.label, ContentLabel::Unknown);
    }
}
