// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Extraction stage: local regex analysis, no network call.
//!
//! Pulls URLs, email addresses, and a fixed set of phishing indicator
//! phrases out of the cleaned text. Matches are kept in document order and
//! duplicates are not collapsed.

use std::sync::OnceLock;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use crate::agents::StageAgent;
use crate::model::{Entity, EntityKind, ExtractionResult};

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\bhttps?://[^\s/$.?#][^\s"]*"#).expect("valid url pattern")
    })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").expect("valid email pattern")
    })
}

/// Indicator phrases, checked independently against the lowercased text.
/// Output order is fixed.
const INDICATOR_RULES: [(&str, &str); 3] = [
    ("password", "Mentions password"),
    ("bank", "Mentions bank"),
    ("urgent", "Uses urgency language"),
];

pub struct ExtractionAgent;

impl ExtractionAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExtractionAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageAgent for ExtractionAgent {
    type Output = ExtractionResult;

    fn stage(&self) -> &'static str {
        "extraction"
    }

    async fn attempt(&self, input: &str) -> Result<ExtractionResult> {
        let urls: Vec<String> = url_pattern()
            .find_iter(input)
            .map(|m| m.as_str().to_string())
            .collect();
        let emails: Vec<String> = email_pattern()
            .find_iter(input)
            .map(|m| m.as_str().to_string())
            .collect();

        let mut entities = Vec::with_capacity(urls.len() + emails.len());
        entities.extend(urls.iter().map(|value| Entity {
            kind: EntityKind::Url,
            value: value.clone(),
        }));
        entities.extend(emails.iter().map(|value| Entity {
            kind: EntityKind::Email,
            value: value.clone(),
        }));

        let lowered = input.to_lowercase();
        let indicators = INDICATOR_RULES
            .iter()
            .filter(|(needle, _)| lowered.contains(needle))
            .map(|(_, indicator)| indicator.to_string())
            .collect();

        Ok(ExtractionResult {
            urls,
            emails,
            entities,
            indicators,
        })
    }

    fn fallback(&self, _input: &str) -> ExtractionResult {
        ExtractionResult {
            urls: Vec::new(),
            emails: Vec::new(),
            entities: Vec::new(),
            indicators: Vec::new(),
        }
    }
}
