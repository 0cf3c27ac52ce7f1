//! Analysis report over a reconciliation outcome.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use plansyn_core::SourceTag;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregate::AggregateOutcome;

/// Report tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Cross-reference ratio below which a matching-quality recommendation
    /// is emitted. The 0.3 default is a starting point with no empirical
    /// backing; it is configuration, not a rule.
    pub low_cross_reference_ratio: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            low_cross_reference_ratio: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub records_with_identifier: usize,
    pub records_with_coordinates: usize,
    pub records_with_document_extract: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub cross_reference_count: usize,
    pub municipalities_covered: usize,
    pub quality: QualityMetrics,
    pub recommendations: Vec<String>,
}

/// Summarize an outcome into counts, quality metrics, and recommendations.
pub fn build_report(outcome: &AggregateOutcome, config: &ReportConfig) -> AnalysisReport {
    let records = &outcome.unified_records;

    let municipalities: BTreeSet<String> = records
        .iter()
        .map(|r| r.municipality.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect();

    let quality = QualityMetrics {
        records_with_identifier: records.iter().filter(|r| r.identifier.is_some()).count(),
        records_with_coordinates: records
            .iter()
            .filter(|r| has_populated(r.attributes.get("coordinates")))
            .count(),
        records_with_document_extract: records
            .iter()
            .filter(|r| r.sources_seen.contains(&SourceTag::PdfExtract))
            .count(),
    };

    AnalysisReport {
        generated_at: Utc::now(),
        total_records: records.len(),
        cross_reference_count: outcome.cross_reference_count,
        municipalities_covered: municipalities.len(),
        quality,
        recommendations: recommendations(outcome, config),
    }
}

fn has_populated(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !plansyn_core::value_is_empty(v))
}

fn recommendations(outcome: &AggregateOutcome, config: &ReportConfig) -> Vec<String> {
    let mut out = Vec::new();
    let total = outcome.unified_records.len();

    if total == 0 {
        out.push("No planning data found; check source configuration".to_string());
        return out;
    }

    let ratio = outcome.cross_reference_count as f64 / total as f64;
    if ratio < config.low_cross_reference_ratio {
        out.push(format!(
            "Cross-reference rate {:.0}% is below the configured {:.0}% threshold; review key matching",
            ratio * 100.0,
            config.low_cross_reference_ratio * 100.0
        ));
    }

    for (source, count) in &outcome.source_counts {
        if *count == 0 {
            out.push(format!("No records arrived from {source}; check the collector"));
        }
    }

    out
}
