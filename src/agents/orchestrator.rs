// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Pipeline orchestrator: cleaning first, then classification, extraction,
//! and summary concurrently over the cleaned text, then report synthesis.
//!
//! The orchestrator cannot fail: every stage converts its own errors into a
//! deterministic fallback, so a run always produces a complete (possibly
//! degraded) result.

use std::sync::Arc;

use crate::agents::classification::ClassificationAgent;
use crate::agents::cleaning::CleaningAgent;
use crate::agents::extraction::ExtractionAgent;
use crate::agents::report;
use crate::agents::summary::SummaryAgent;
use crate::agents::StageAgent;
use crate::cache::ResultCache;
use crate::metrics::Metrics;
use crate::model::{
    ClassificationResult, OrchestratedAnalysisResult, StageOutput, StageProvenance,
};
use crate::upstream::{ChatCompletion, Summarize};

#[derive(Clone)]
pub struct Orchestrator {
    cleaning: Arc<CleaningAgent>,
    classification: Arc<ClassificationAgent>,
    extraction: Arc<ExtractionAgent>,
    summary: Arc<SummaryAgent>,
    cache: ResultCache,
    metrics: Metrics,
}

impl Orchestrator {
    pub fn new(
        cleaning_provider: Option<Arc<dyn ChatCompletion>>,
        classifier_provider: Option<Arc<dyn ChatCompletion>>,
        summary_provider: Option<Arc<dyn Summarize>>,
        cache: ResultCache,
        metrics: Metrics,
    ) -> Self {
        Self {
            cleaning: Arc::new(CleaningAgent::new(cleaning_provider)),
            classification: Arc::new(ClassificationAgent::new(classifier_provider)),
            extraction: Arc::new(ExtractionAgent::new()),
            summary: Arc::new(SummaryAgent::new(summary_provider)),
            cache,
            metrics,
        }
    }

    pub async fn run(&self, text: &str) -> OrchestratedAnalysisResult {
        let cleaning = self.cleaning.run(&self.cache, text).await;
        let cleaned_text = cleaning.value.cleaned_text.clone();

        // Classification, extraction, and summary only read the cleaned
        // text; the cache is safe under concurrent access.
        let (classification, extraction, summary) = tokio::join!(
            self.classification.run(&self.cache, &cleaned_text),
            self.extraction.run(&self.cache, &cleaned_text),
            self.summary.run(&self.cache, &cleaned_text),
        );

        let provenance = StageProvenance {
            cleaning: cleaning.origin,
            classification: classification.origin,
            extraction: extraction.origin,
            summary: summary.origin,
        };
        self.record_fallbacks(&cleaning, &classification, &extraction, &summary);

        let report = report::aggregate(&classification.value, &extraction.value, &summary.value);

        OrchestratedAnalysisResult {
            cleaning: cleaning.value,
            classification: classification.value,
            extraction: extraction.value,
            summary: summary.value,
            report,
            provenance,
        }
    }

    /// Run only the classification stage against raw content. Shares the
    /// classification cache namespace with full pipeline runs.
    pub async fn classify(&self, text: &str) -> StageOutput<ClassificationResult> {
        let output = self.classification.run(&self.cache, text).await;
        if output.is_degraded() {
            self.metrics.record_stage_fallback("classification");
        }
        output
    }

    fn record_fallbacks<A, B, C, D>(
        &self,
        cleaning: &StageOutput<A>,
        classification: &StageOutput<B>,
        extraction: &StageOutput<C>,
        summary: &StageOutput<D>,
    ) {
        for (stage, degraded) in [
            ("cleaning", cleaning.is_degraded()),
            ("classification", classification.is_degraded()),
            ("extraction", extraction.is_degraded()),
            ("summary", summary.is_degraded()),
        ] {
            if degraded {
                self.metrics.record_stage_fallback(stage);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::classification::FALLBACK_REASON;
    use crate::model::{ContentLabel, EntityKind, StageOrigin};
    use crate::upstream::MockChatCompletion;
    use std::time::Duration;

    fn offline_orchestrator() -> Orchestrator {
        Orchestrator::new(
            None,
            None,
            None,
            ResultCache::new(Duration::from_secs(300)),
            Metrics::new().expect("metrics"),
        )
    }

    #[tokio::test]
    async fn degraded_end_to_end_run_is_fully_deterministic() {
        let input = "Dear user, your account is suspended. Urgent: verify at \
                     http://phish.example/login or email support@phish.example";
        let result = offline_orchestrator().run(input).await;

        // Cleaning degrades to the trimmed input.
        assert_eq!(result.cleaning.cleaned_text, input);
        assert_eq!(result.provenance.cleaning, StageOrigin::Fallback);

        // Classification degrades to the conservative unknown verdict.
        assert_eq!(result.classification.label, ContentLabel::Unknown);
        assert!((result.classification.confidence - 0.3).abs() < 1e-9);
        assert_eq!(result.classification.reasons, vec![FALLBACK_REASON.to_string()]);

        // Extraction still runs locally.
        assert_eq!(result.extraction.urls, vec!["http://phish.example/login"]);
        assert_eq!(result.extraction.emails, vec!["support@phish.example"]);
        assert_eq!(result.extraction.indicators, vec!["Uses urgency language"]);
        assert_eq!(result.provenance.extraction, StageOrigin::Provider);
        assert_eq!(result.extraction.entities[0].kind, EntityKind::Url);

        // Summary degrades to the truncated cleaned text.
        assert_eq!(result.summary.summary, input);
        assert_eq!(result.provenance.summary, StageOrigin::Fallback);

        // Report: min(1, 0.3 + 1 * 0.05).
        assert!((result.report.risk_score - 0.35).abs() < 1e-9);
        assert_eq!(result.report.overall_label, ContentLabel::Unknown);
    }

    #[tokio::test]
    async fn downstream_stages_see_the_cleaned_text() {
        let mut cleaning = MockChatCompletion::new();
        cleaning
            .expect_complete()
            .returning(|_| Ok("visit https://kept.example".to_string()));

        let orchestrator = Orchestrator::new(
            Some(Arc::new(cleaning)),
            None,
            None,
            ResultCache::new(Duration::from_secs(300)),
            Metrics::new().expect("metrics"),
        );

        let result = orchestrator
            .run("Hi team,\n\nvisit https://kept.example\n\nBest, Bob")
            .await;

        assert_eq!(result.provenance.cleaning, StageOrigin::Provider);
        assert_eq!(result.extraction.urls, vec!["https://kept.example"]);
        assert_eq!(result.summary.summary, "visit https://kept.example");
    }

    #[tokio::test]
    async fn repeated_runs_reuse_stage_caches() {
        let mut classifier = MockChatCompletion::new();
        classifier.expect_complete().times(1).returning(|_| {
            Ok(r#"{"label":"spam","confidence":0.9,"reasons":[]}"#.to_string())
        });

        let orchestrator = Orchestrator::new(
            None,
            Some(Arc::new(classifier)),
            None,
            ResultCache::new(Duration::from_secs(300)),
            Metrics::new().expect("metrics"),
        );

        let first = orchestrator.run("buy now").await;
        let second = orchestrator.run("buy now").await;

        assert_eq!(first, second);
        assert_eq!(first.classification.label, ContentLabel::Spam);
    }

    #[tokio::test]
    async fn classify_only_skips_the_rest_of_the_pipeline() {
        let output = offline_orchestrator().classify("content").await;
        assert_eq!(output.value.label, ContentLabel::Unknown);
        assert_eq!(output.origin, StageOrigin::Fallback);
    }
}
