//! Merge resolution for records sharing a grouping key.
//!
//! Policy: first-non-empty-wins for scalar fields (fold order decides
//! ties), list attributes concatenate, the relevance score keeps its max,
//! and `sources_seen` is unioned. Populated values on the existing record
//! are never overwritten and never dropped.

use plansyn_core::{value_is_empty, PlanningRecord};
use serde_json::Value;

/// Attribute stamped by the aggregation driver with matched sub-areas.
pub const MATCHED_AREAS_ATTR: &str = "matched_areas";

/// Attribute holding the classifier's numeric relevance score; the one
/// attribute merged by maximum rather than first-wins.
pub const RELEVANCE_SCORE_ATTR: &str = "relevance_score";

/// Fold `incoming` into `existing`.
///
/// Merging a record into an identical copy of itself leaves it unchanged
/// apart from `sources_seen` not growing: an incoming list equal to the
/// existing one is skipped instead of concatenated.
pub fn merge_into(existing: &mut PlanningRecord, incoming: PlanningRecord) {
    existing.sources_seen.extend(incoming.sources_seen);

    if existing.identifier.is_none() {
        existing.identifier = incoming.identifier.filter(|id| !id.trim().is_empty());
    }
    if existing.title.trim().is_empty() && !incoming.title.trim().is_empty() {
        existing.title = incoming.title;
    }
    if existing.municipality.trim().is_empty() && !incoming.municipality.trim().is_empty() {
        existing.municipality = incoming.municipality;
    }

    for (name, value) in incoming.attributes {
        if value_is_empty(&value) {
            continue;
        }
        match existing.attributes.get_mut(&name) {
            None => {
                existing.attributes.insert(name, value);
            }
            Some(current) if value_is_empty(current) => {
                *current = value;
            }
            Some(current) => merge_populated(&name, current, value),
        }
    }
}

fn merge_populated(name: &str, current: &mut Value, incoming: Value) {
    match (current, incoming) {
        (Value::Array(existing_items), Value::Array(incoming_items)) => {
            // Identical lists are skipped; different lists concatenate and
            // keep duplicate sub-items.
            if *existing_items != incoming_items {
                existing_items.extend(incoming_items);
            }
        }
        (current @ Value::Number(_), incoming @ Value::Number(_))
            if name == RELEVANCE_SCORE_ATTR =>
        {
            if number_value(&incoming) > number_value(current) {
                *current = incoming;
            }
        }
        // First populated value wins; no conflict reporting.
        _ => {}
    }
}

fn number_value(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plansyn_core::{RawRecord, SourceTag};
    use serde_json::json;

    fn record(source: SourceTag) -> PlanningRecord {
        PlanningRecord::from_raw(
            RawRecord::new(source)
                .with_title("Reguleringsplan Sentrum")
                .with_municipality("Oslo"),
        )
    }

    #[test]
    fn unions_sources_and_fills_empty_fields() {
        let mut existing = record(SourceTag::Geonorge);
        existing.title = String::new();

        let mut incoming = record(SourceTag::OsloOrigo);
        incoming.identifier = Some("OSL-001".into());

        merge_into(&mut existing, incoming);

        assert_eq!(existing.sources_seen.len(), 2);
        assert_eq!(existing.identifier.as_deref(), Some("OSL-001"));
        assert_eq!(existing.title, "Reguleringsplan Sentrum");
        assert!(existing.is_cross_referenced());
    }

    #[test]
    fn populated_scalars_are_never_overwritten() {
        let mut existing = record(SourceTag::Geonorge);
        existing
            .attributes
            .insert("status".into(), json!("vedtatt"));

        let mut incoming = record(SourceTag::OsloOrigo);
        incoming.title = "Another Title".into();
        incoming.municipality = "Bergen".into();
        incoming
            .attributes
            .insert("status".into(), json!("forslag"));

        merge_into(&mut existing, incoming);

        assert_eq!(existing.title, "Reguleringsplan Sentrum");
        assert_eq!(existing.municipality, "Oslo");
        assert_eq!(existing.attributes["status"], json!("vedtatt"));
    }

    #[test]
    fn lists_concatenate_and_keep_duplicates() {
        let mut existing = record(SourceTag::Geonorge);
        existing
            .attributes
            .insert("dates".into(), json!(["2020-01-01", "2021-06-30"]));

        let mut incoming = record(SourceTag::PdfExtract);
        incoming
            .attributes
            .insert("dates".into(), json!(["2021-06-30", "2022-12-01"]));

        merge_into(&mut existing, incoming);

        assert_eq!(
            existing.attributes["dates"],
            json!(["2020-01-01", "2021-06-30", "2021-06-30", "2022-12-01"])
        );
    }

    #[test]
    fn relevance_score_keeps_max_other_numbers_keep_first() {
        let mut existing = record(SourceTag::Geonorge);
        existing.attributes.insert(RELEVANCE_SCORE_ATTR.into(), json!(3));
        existing.attributes.insert("area_m2".into(), json!(250_000));

        let mut incoming = record(SourceTag::PdfExtract);
        incoming.attributes.insert(RELEVANCE_SCORE_ATTR.into(), json!(7));
        incoming.attributes.insert("area_m2".into(), json!(999));

        merge_into(&mut existing, incoming);

        assert_eq!(existing.attributes[RELEVANCE_SCORE_ATTR], json!(7));
        assert_eq!(existing.attributes["area_m2"], json!(250_000));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut rec = record(SourceTag::Geonorge);
        rec.identifier = Some("2020-123".into());
        rec.attributes.insert("dates".into(), json!(["2020-01-01"]));
        rec.attributes.insert(RELEVANCE_SCORE_ATTR.into(), json!(5));
        rec.attributes.insert("status".into(), json!("vedtatt"));

        let copy = rec.clone();
        merge_into(&mut rec, copy.clone());
        assert_eq!(rec, copy);
    }

    #[test]
    fn merge_is_monotonic_in_population() {
        let mut existing = record(SourceTag::Geonorge);
        existing.attributes.insert("a".into(), json!("x"));

        let mut incoming = record(SourceTag::OsloOrigo);
        incoming.attributes.insert("b".into(), json!(["y"]));
        incoming.attributes.insert("c".into(), json!(1.5));

        merge_into(&mut existing, incoming);

        for attr in ["a", "b", "c"] {
            assert!(
                !value_is_empty(&existing.attributes[attr]),
                "attribute {attr} dropped"
            );
        }
    }

    #[test]
    fn empty_incoming_values_are_ignored() {
        let mut existing = record(SourceTag::Geonorge);
        let mut incoming = record(SourceTag::OsloOrigo);
        incoming.attributes.insert("notes".into(), json!(""));
        incoming.attributes.insert("links".into(), json!([]));

        merge_into(&mut existing, incoming);

        assert!(!existing.attributes.contains_key("notes"));
        assert!(!existing.attributes.contains_key("links"));
    }
}
