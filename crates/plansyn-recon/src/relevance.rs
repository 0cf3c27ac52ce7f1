//! Municipality-relevance classification by substring containment.
//!
//! Matching is plain lowercase substring containment with no token
//! boundaries or diacritic folding, so short area names can false-positive
//! on unrelated words ("alna" inside "Smalnakken"). That approximation is
//! accepted and documented rather than silently tightened.

use serde::{Deserialize, Serialize};

use crate::config::KeywordTable;

/// Outcome of classifying one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceHit {
    /// True when any term in any category matched.
    pub relevant: bool,
    /// Matched terms from the table's area category, in table order.
    pub matched_areas: Vec<String>,
    /// Matched terms from every other category, in table order.
    pub matched_terms: Vec<String>,
    /// Sum of category weights over all matched terms.
    pub score: u32,
}

/// Classify `text` against the keyword table.
pub fn classify(text: &str, table: &KeywordTable) -> RelevanceHit {
    let haystack = text.to_lowercase();

    let mut matched_areas = Vec::new();
    let mut matched_terms = Vec::new();
    let mut score = 0u32;

    for (category_name, category) in &table.categories {
        let is_area_category = *category_name == table.area_category;
        for term in &category.terms {
            if haystack.contains(term.to_lowercase().as_str()) {
                score += category.weight;
                if is_area_category {
                    matched_areas.push(term.clone());
                } else {
                    matched_terms.push(term.clone());
                }
            }
        }
    }

    RelevanceHit {
        relevant: score > 0,
        matched_areas,
        matched_terms,
        score,
    }
}
