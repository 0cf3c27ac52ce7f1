//! Aggregation driver: folds per-source record batches into one unified,
//! deduplicated collection plus a sub-area coverage summary.
//!
//! Batches are folded left to right in the order they are passed, so the
//! first source wins ties under the first-non-empty merge policy. That
//! ordering dependency is part of the contract; callers choose precedence
//! by choosing batch order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use plansyn_core::{PlanningRecord, RawRecord, SourceTag};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::KeywordTable;
use crate::key::{generate_key, is_isolation_key};
use crate::merge::{merge_into, MATCHED_AREAS_ATTR, RELEVANCE_SCORE_ATTR};
use crate::relevance::classify;

/// Raw records from one source, in collector order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBatch {
    pub source: SourceTag,
    pub records: Vec<RawRecord>,
}

impl SourceBatch {
    pub fn new(source: SourceTag, records: Vec<RawRecord>) -> Self {
        Self { source, records }
    }
}

/// Sub-area coverage over the unified collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub matched_areas: BTreeSet<String>,
    pub total_areas: usize,
    /// Configured areas no record mentioned, in table order.
    pub missing_areas: Vec<String>,
    pub percent: f64,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateOutcome {
    /// Unified records in first-seen order.
    pub unified_records: Vec<PlanningRecord>,
    /// Records merged from two or more sources.
    pub cross_reference_count: usize,
    pub coverage: Coverage,
    /// Raw input record counts per source, before deduplication.
    pub source_counts: BTreeMap<SourceTag, usize>,
}

/// Fold `batches` into a unified collection.
///
/// Single synchronous pass, no I/O, never fails: malformed records degrade
/// to hash-isolated entries and empty batches simply contribute nothing.
/// Deterministic for a given batch order.
pub fn aggregate(batches: Vec<SourceBatch>, table: &KeywordTable) -> AggregateOutcome {
    let mut unified: Vec<(String, PlanningRecord)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut source_counts: BTreeMap<SourceTag, usize> = BTreeMap::new();

    for batch in batches {
        *source_counts.entry(batch.source).or_default() += batch.records.len();
        for raw in batch.records {
            let mut record = PlanningRecord::from_raw(raw);
            stamp_relevance(&mut record, table);

            let key = generate_key(&record);
            match index.get(&key) {
                Some(&slot) => merge_into(&mut unified[slot].1, record),
                None => {
                    index.insert(key.clone(), unified.len());
                    unified.push((key, record));
                }
            }
        }
    }

    let linked = cross_link_documents(&mut unified);
    debug!(unified = unified.len(), linked, "reconciliation pass complete");

    let coverage = assess_coverage(&unified, table);
    let unified_records: Vec<PlanningRecord> =
        unified.into_iter().map(|(_, record)| record).collect();
    let cross_reference_count = unified_records
        .iter()
        .filter(|r| r.is_cross_referenced())
        .count();

    AggregateOutcome {
        unified_records,
        cross_reference_count,
        coverage,
        source_counts,
    }
}

/// Classify title + description and stamp the match onto the record.
///
/// A score already present (a collector that classified the full document
/// body, say) is kept when higher; stamped areas extend the existing list.
fn stamp_relevance(record: &mut PlanningRecord, table: &KeywordTable) {
    let mut text = record.title.clone();
    if let Some(description) = record.attributes.get("description").and_then(Value::as_str) {
        text.push(' ');
        text.push_str(description);
    }

    let hit = classify(&text, table);
    if !hit.relevant {
        return;
    }

    match record.attributes.get_mut(MATCHED_AREAS_ATTR) {
        Some(Value::Array(existing)) => {
            for area in hit.matched_areas {
                let value = Value::String(area);
                if !existing.contains(&value) {
                    existing.push(value);
                }
            }
        }
        _ => {
            record
                .attributes
                .insert(MATCHED_AREAS_ATTR.to_string(), json!(hit.matched_areas));
        }
    }

    let previous = record
        .attributes
        .get(RELEVANCE_SCORE_ATTR)
        .and_then(Value::as_u64)
        .unwrap_or(0);
    record.attributes.insert(
        RELEVANCE_SCORE_ATTR.to_string(),
        json!(previous.max(u64::from(hit.score))),
    );
}

/// Attach document-extract records that the key fold left unmatched.
///
/// A record seen only by the document extractor, carrying an identifier
/// and a municipality hint, is linked to the unified record whose
/// municipality contains (or is contained by) its own and whose identifier
/// or title mentions its identifier. Where several candidates match, the
/// most specific one wins: an identifier-in-identifier hit beats an
/// identifier-in-title hit, then the longer municipality overlap, then the
/// earliest record. Making the tie-break explicit keeps the pass
/// deterministic regardless of scan order.
fn cross_link_documents(unified: &mut Vec<(String, PlanningRecord)>) -> usize {
    let mut linked = 0usize;

    let mut i = unified.len();
    while i > 0 {
        i -= 1;
        if !is_document_only(&unified[i].1) {
            continue;
        }
        let Some(target) = best_link_target(unified, i) else {
            continue;
        };

        let (_, document_record) = unified.remove(i);
        // removing i shifts every later index down by one
        let target = if target > i { target - 1 } else { target };
        merge_into(&mut unified[target].1, document_record);
        linked += 1;
    }

    linked
}

fn is_document_only(record: &PlanningRecord) -> bool {
    record.sources_seen.len() == 1
        && record.sources_seen.contains(&SourceTag::PdfExtract)
        && record.identifier.is_some()
        && !record.municipality.trim().is_empty()
}

fn best_link_target(unified: &[(String, PlanningRecord)], doc_idx: usize) -> Option<usize> {
    let doc = &unified[doc_idx].1;
    let doc_municipality = doc.municipality.trim().to_lowercase();
    let doc_id = doc.identifier.as_deref()?.trim();
    if doc_id.is_empty() {
        return None;
    }

    let mut best: Option<(LinkSpecificity, usize)> = None;
    for (idx, (key, candidate)) in unified.iter().enumerate() {
        if idx == doc_idx || is_isolation_key(key) {
            continue;
        }
        // documents link to plans, not to other documents
        if candidate.sources_seen.len() == 1
            && candidate.sources_seen.contains(&SourceTag::PdfExtract)
        {
            continue;
        }
        let candidate_municipality = candidate.municipality.trim().to_lowercase();
        if candidate_municipality.is_empty() {
            continue;
        }
        if !candidate_municipality.contains(&doc_municipality)
            && !doc_municipality.contains(&candidate_municipality)
        {
            continue;
        }

        let id_in_identifier = candidate
            .identifier
            .as_deref()
            .is_some_and(|id| id.contains(doc_id));
        let id_in_title = candidate.title.contains(doc_id);
        if !id_in_identifier && !id_in_title {
            continue;
        }

        let specificity = LinkSpecificity {
            id_in_identifier,
            municipality_overlap: doc_municipality.len().min(candidate_municipality.len()),
        };
        let better = match &best {
            None => true,
            Some((current, _)) => specificity > *current,
        };
        if better {
            best = Some((specificity, idx));
        }
    }

    best.map(|(_, idx)| idx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct LinkSpecificity {
    id_in_identifier: bool,
    municipality_overlap: usize,
}

fn assess_coverage(unified: &[(String, PlanningRecord)], table: &KeywordTable) -> Coverage {
    let mut matched_areas = BTreeSet::new();
    for (_, record) in unified {
        if let Some(Value::Array(areas)) = record.attributes.get(MATCHED_AREAS_ATTR) {
            for area in areas {
                if let Some(name) = area.as_str() {
                    matched_areas.insert(name.to_string());
                }
            }
        }
    }

    let areas = table.areas();
    let missing_areas: Vec<String> = areas
        .iter()
        .filter(|area| !matched_areas.contains(*area))
        .cloned()
        .collect();
    let percent = if areas.is_empty() {
        0.0
    } else {
        (matched_areas.len() as f64 / areas.len() as f64) * 100.0
    };

    Coverage {
        matched_areas,
        total_areas: areas.len(),
        missing_areas,
        percent,
    }
}
