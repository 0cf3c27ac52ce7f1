//! Advisory near-duplicate review queue.
//!
//! The key fold is literal and misses pairs like "Reguleringsplan Frogner
//! Park" vs "Frogner Park Plan" (different derivation paths). This pass
//! surfaces such pairs by title similarity for human review. It is purely
//! advisory: proposals never change the unified collection.

use plansyn_core::PlanningRecord;
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Minimum title similarity for a pair to be proposed.
    pub similarity_threshold: f64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.9,
        }
    }
}

/// A pair of unified records that may describe the same plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCandidate {
    pub index_a: usize,
    pub index_b: usize,
    pub title_a: String,
    pub title_b: String,
    pub confidence: f64,
}

/// Propose possible duplicates among records that did not share a key.
pub fn near_duplicates(records: &[PlanningRecord], config: &ReviewConfig) -> Vec<ReviewCandidate> {
    let normalized: Vec<String> = records
        .iter()
        .map(|r| normalize_title(&r.title))
        .collect();

    let mut candidates = Vec::new();
    for i in 0..records.len() {
        if normalized[i].is_empty() {
            continue;
        }
        for j in (i + 1)..records.len() {
            if normalized[j].is_empty() {
                continue;
            }
            // records in different municipalities are not worth proposing
            if !same_municipality(&records[i], &records[j]) {
                continue;
            }
            let confidence = jaro_winkler(&normalized[i], &normalized[j]);
            if confidence >= config.similarity_threshold {
                candidates.push(ReviewCandidate {
                    index_a: i,
                    index_b: j,
                    title_a: records[i].title.clone(),
                    title_b: records[j].title.clone(),
                    confidence,
                });
            }
        }
    }
    candidates
}

fn same_municipality(a: &PlanningRecord, b: &PlanningRecord) -> bool {
    let ma = a.municipality.trim().to_lowercase();
    let mb = b.municipality.trim().to_lowercase();
    !ma.is_empty() && ma == mb
}

/// Lowercase, strip punctuation, collapse whitespace.
fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
