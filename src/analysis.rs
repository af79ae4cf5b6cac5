// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Analysis service: whole-pipeline cache in front of the orchestrator.
//!
//! A hit here skips the entire pipeline, including every stage sub-cache.
//! The orchestrator itself cannot fail (stages self-heal), so this layer
//! has no error path of its own; request validation and persistence errors
//! live at the HTTP layer.

use std::time::Instant;

use crate::agents::orchestrator::Orchestrator;
use crate::cache::{cache_key, ResultCache};
use crate::metrics::Metrics;
use crate::model::{ClassificationResult, OrchestratedAnalysisResult, StageOutput};

#[derive(Clone)]
pub struct AnalysisService {
    orchestrator: Orchestrator,
    cache: ResultCache,
    metrics: Metrics,
}

impl AnalysisService {
    pub fn new(orchestrator: Orchestrator, cache: ResultCache, metrics: Metrics) -> Self {
        Self {
            orchestrator,
            cache,
            metrics,
        }
    }

    pub async fn process(&self, text: &str) -> OrchestratedAnalysisResult {
        let key = cache_key("orchestrator", &text);

        if let Some(cached) = self.cache.get::<OrchestratedAnalysisResult>(&key).await {
            self.metrics.record_cache_hit();
            return cached;
        }
        self.metrics.record_cache_miss();

        let started = Instant::now();
        let result = self.orchestrator.run(text).await;
        self.metrics.record_pipeline_run(started.elapsed().as_secs_f64());

        self.cache.set(&key, &result).await;
        result
    }

    /// Classification-only path used by spam checks.
    pub async fn classify(&self, text: &str) -> StageOutput<ClassificationResult> {
        self.orchestrator.classify(text).await
    }
}
