//! Keyword table configuration.
//!
//! Area and plan-term keyword lists live in one externally-supplied table
//! of `{category: [terms]}` loaded from `keywords.yaml`, so classifier,
//! coverage reporting, and document analysis all read the same lists.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One keyword category with its relevance weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCategory {
    /// Score contributed by each matched term in this category.
    #[serde(default = "default_weight")]
    pub weight: u32,
    pub terms: Vec<String>,
}

fn default_weight() -> u32 {
    1
}

/// Externally-supplied keyword table for the relevance classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTable {
    /// Name of the category whose terms are the target municipality's
    /// sub-areas; coverage is reported against this category only.
    pub area_category: String,
    pub categories: BTreeMap<String, KeywordCategory>,
}

impl KeywordTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let table: KeywordTable =
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        Ok(table)
    }

    /// Sub-area terms used for coverage reporting. Empty slice when the
    /// configured area category is missing from the table.
    pub fn areas(&self) -> &[String] {
        self.categories
            .get(&self.area_category)
            .map(|c| c.terms.as_slice())
            .unwrap_or(&[])
    }
}
