// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Report aggregation: pure, deterministic synthesis of the upstream stage
//! results into a risk score and a rendered report. No cache, no I/O.
//!
//! Known limitation: extracted email addresses feed the risk inputs but are
//! not rendered into the "Indicators & Entities" section; only URLs are.

use crate::model::{
    ClassificationResult, ContentLabel, ExtractionResult, ReportResult, ReportSection,
    SummaryResult,
};

/// Risk floor applied per label before the indicator boost.
fn label_floor(label: ContentLabel) -> Option<f64> {
    match label {
        ContentLabel::Phishing | ContentLabel::DarkPattern => Some(0.8),
        ContentLabel::Spam => Some(0.6),
        ContentLabel::Legitimate | ContentLabel::Unknown => None,
    }
}

pub fn aggregate(
    classification: &ClassificationResult,
    extraction: &ExtractionResult,
    summary: &SummaryResult,
) -> ReportResult {
    let mut base = classification.confidence;
    if let Some(floor) = label_floor(classification.label) {
        base = base.max(floor);
    }

    let indicator_boost = (extraction.indicators.len() as f64 * 0.05).min(0.2);
    let risk_score = (base + indicator_boost).min(1.0);

    let sections = vec![
        ReportSection {
            title: "Summary".to_string(),
            content: summary.summary.clone(),
        },
        ReportSection {
            title: "Classification".to_string(),
            content: format!(
                "Label: {} (confidence: {:.2})\nReasons:\n- {}",
                classification.label,
                classification.confidence,
                classification.reasons.join("\n- ")
            ),
        },
        ReportSection {
            title: "Indicators & Entities".to_string(),
            content: format!(
                "Indicators:\n- {}\n\nURLs:\n- {}",
                extraction.indicators.join("\n- "),
                extraction.urls.join("\n- ")
            ),
        },
    ];

    ReportResult {
        risk_score,
        overall_label: classification.label,
        sections,
    }
}
