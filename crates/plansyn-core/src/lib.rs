//! Core domain model for plansyn: normalized planning records and source tags.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CRATE_NAME: &str = "plansyn-core";

/// Origin of a planning record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Geonorge,
    OsloOrigo,
    PdfExtract,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Geonorge => "geonorge",
            SourceTag::OsloOrigo => "oslo_origo",
            SourceTag::PdfExtract => "pdf_extract",
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open-ended extra fields (coordinates, dates, area sizes, keyword hits).
/// Schema varies by source; `BTreeMap` keeps serialization deterministic.
pub type Attributes = BTreeMap<String, Value>;

/// Handoff contract from source collectors into the reconciliation pass.
///
/// Collectors map whatever raw API/PDF shape they see into this minimal
/// form; every field except `source` is best-effort free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub source: SourceTag,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl RawRecord {
    pub fn new(source: SourceTag) -> Self {
        Self {
            source,
            identifier: None,
            title: None,
            municipality: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_municipality(mut self, municipality: impl Into<String>) -> Self {
        self.municipality = Some(municipality.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }
}

/// One normalized planning item, possibly merged from several sources.
///
/// Intended invariant: one logical plan appears once in the final
/// aggregate, tagged with every source that mentioned it. Municipality
/// string matching is a heuristic, not an identity function, so false
/// merges and missed merges are both expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningRecord {
    /// Source the record was first seen in.
    pub source: SourceTag,
    /// External plan/case ID; unvalidated free text.
    pub identifier: Option<String>,
    /// Human-readable plan name; may be empty.
    pub title: String,
    /// Free-text place name derived heuristically from title or body.
    pub municipality: String,
    pub attributes: Attributes,
    pub sources_seen: BTreeSet<SourceTag>,
}

impl PlanningRecord {
    pub fn from_raw(raw: RawRecord) -> Self {
        let mut sources_seen = BTreeSet::new();
        sources_seen.insert(raw.source);
        Self {
            source: raw.source,
            identifier: raw.identifier.filter(|id| !id.trim().is_empty()),
            title: raw.title.unwrap_or_default(),
            municipality: raw.municipality.unwrap_or_default(),
            attributes: raw.attributes,
            sources_seen,
        }
    }

    /// A record formed by merging inputs from two or more sources.
    pub fn is_cross_referenced(&self) -> bool {
        self.sources_seen.len() >= 2
    }
}

/// Emptiness as the merge resolver sees it: absent, null, blank string,
/// empty array/object, or zero-length anything.
pub fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_tags_serialize_snake_case() {
        assert_eq!(serde_json::to_string(&SourceTag::OsloOrigo).unwrap(), "\"oslo_origo\"");
        assert_eq!(
            serde_json::from_str::<SourceTag>("\"pdf_extract\"").unwrap(),
            SourceTag::PdfExtract
        );
    }

    #[test]
    fn from_raw_drops_blank_identifier() {
        let raw = RawRecord::new(SourceTag::Geonorge)
            .with_identifier("   ")
            .with_title("Reguleringsplan Sentrum");
        let record = PlanningRecord::from_raw(raw);
        assert_eq!(record.identifier, None);
        assert_eq!(record.title, "Reguleringsplan Sentrum");
        assert!(record.sources_seen.contains(&SourceTag::Geonorge));
        assert!(!record.is_cross_referenced());
    }

    #[test]
    fn emptiness_matches_merge_semantics() {
        assert!(value_is_empty(&Value::Null));
        assert!(value_is_empty(&json!("")));
        assert!(value_is_empty(&json!("  ")));
        assert!(value_is_empty(&json!([])));
        assert!(value_is_empty(&json!({})));
        assert!(!value_is_empty(&json!(0)));
        assert!(!value_is_empty(&json!(false)));
        assert!(!value_is_empty(&json!("Oslo")));
    }
}
