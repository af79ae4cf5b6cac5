// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics for the analysis service.
//!
//! Tracks pipeline throughput, whole-pipeline cache behavior, and how often
//! stages serve degraded (fallback) results.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

use crate::error::AppError;

#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,

    pub pipeline_runs: IntCounter,
    pub pipeline_duration: Histogram,

    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,

    /// Stage results served from a local fallback, labeled by stage.
    /// Counts cache hits on degraded entries too: it measures what callers
    /// actually received, not provider failures alone.
    pub stage_fallbacks: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new();

        let pipeline_runs = IntCounter::with_opts(Opts::new(
            "veriline_pipeline_runs_total",
            "Total number of full pipeline executions",
        ))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        let pipeline_duration = Histogram::with_opts(
            HistogramOpts::new(
                "veriline_pipeline_duration_seconds",
                "Full pipeline execution time in seconds",
            )
            .buckets(vec![0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        let cache_hits = IntCounter::with_opts(Opts::new(
            "veriline_analysis_cache_hits_total",
            "Whole-pipeline cache hits",
        ))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        let cache_misses = IntCounter::with_opts(Opts::new(
            "veriline_analysis_cache_misses_total",
            "Whole-pipeline cache misses",
        ))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        let stage_fallbacks = IntCounterVec::new(
            Opts::new(
                "veriline_stage_fallbacks_total",
                "Stage results served from a deterministic fallback",
            ),
            &["stage"],
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        registry
            .register(Box::new(pipeline_runs.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(pipeline_duration.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(cache_hits.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(cache_misses.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(stage_fallbacks.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;

        Ok(Self {
            registry: Arc::new(registry),
            pipeline_runs,
            pipeline_duration,
            cache_hits,
            cache_misses,
            stage_fallbacks,
        })
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    pub fn record_pipeline_run(&self, seconds: f64) {
        self.pipeline_runs.inc();
        self.pipeline_duration.observe(seconds);
    }

    pub fn record_stage_fallback(&self, stage: &str) {
        self.stage_fallbacks.with_label_values(&[stage]).inc();
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> Result<String, AppError> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode metrics: {}", e)))?;

        String::from_utf8(buffer)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to convert metrics: {}", e)))
    }
}
