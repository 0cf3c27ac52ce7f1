//! Analyzer for pre-extracted plan-document text.
//!
//! Takes plain text that has already been pulled out of a plan PDF and
//! scrapes out identifiers, municipalities, coordinates, dates, plan type,
//! and area figures with ordered regex sweeps. Everything is best-effort:
//! a pattern that matches nothing contributes nothing, and the analysis
//! never fails.

use std::sync::LazyLock;

use plansyn_core::{RawRecord, SourceTag};
use plansyn_recon::{classify, KeywordTable, MATCHED_AREAS_ATTR, RELEVANCE_SCORE_ATTR};
use regex::Regex;
use serde::Serialize;
use serde_json::json;

/// Plan types checked in order of how specific the vocabulary is; the
/// first one present in the text wins.
const PLAN_TYPES: [&str; 5] = [
    "kommuneplan",
    "detaljregulering",
    "områderegulering",
    "reguleringsplan",
    "temaplan",
];

const MAX_COORDINATES_PER_PATTERN: usize = 5;
const MAX_DATES_PER_PATTERN: usize = 5;
const MAX_CONTEXTS_PER_KEYWORD: usize = 2;

static PLAN_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)plan[- ]?id[:\s]*([A-Za-z0-9\-\.]+)",
        r"(?i)saksnummer[:\s]*([A-Za-z0-9\-\./]+)",
        r"(?i)plannummer[:\s]*([A-Za-z0-9\-\.]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static plan-id pattern"))
    .collect()
});

static MUNICIPALITY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)([A-Za-zÆØÅæøå\s]+)\s+kommune",
        r"(?i)kommune[:\s]+([A-Za-zÆØÅæøå\s]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static municipality pattern"))
    .collect()
});

static COORDINATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d+\.\d+)[,\s]+(\d+\.\d+)",
        r"UTM\s*[\d\s]*[,:\s]*(\d+)[,\s]+(\d+)",
        r"N\s*(\d+)[,\s]+E\s*(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static coordinate pattern"))
    .collect()
});

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d{1,2})\.(\d{1,2})\.(\d{4})",
        r"(\d{4})-(\d{1,2})-(\d{1,2})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static date pattern"))
    .collect()
});

static AREA_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+[\.,]\d+)\s*(hektar|ha)",
        r"(?i)(\d+[\.,]\d+)\s*(kvadratmeter|m2|m²)",
        r"(?i)areal[:\s]*(\d+[\.,]\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static area pattern"))
    .collect()
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

#[derive(Debug, Clone, Serialize)]
pub struct CoordinatePair {
    pub x: String,
    pub y: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateMention {
    pub raw: String,
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaFigure {
    pub value: String,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordContext {
    pub keyword: String,
    pub context: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentStats {
    pub total_chars: usize,
    pub total_words: usize,
    pub total_lines: usize,
}

/// Everything scraped from one document's text.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub source_path: String,
    pub plan_id: Option<String>,
    pub municipality: String,
    pub coordinates: Vec<CoordinatePair>,
    pub dates: Vec<DateMention>,
    pub plan_type: Option<String>,
    pub area_figures: Vec<AreaFigure>,
    pub keyword_contexts: Vec<KeywordContext>,
    pub matched_areas: Vec<String>,
    pub relevance_score: u32,
    pub content_stats: ContentStats,
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    for pattern in patterns {
        if let Some(caps) = pattern.captures(text) {
            if let Some(found) = caps.get(1) {
                let found = found.as_str().trim();
                if !found.is_empty() {
                    return Some(found.to_string());
                }
            }
        }
    }
    None
}

/// Strip the "kommune" suffix, collapse whitespace runs, and title-case
/// each word. Blank input maps to "Unknown".
pub fn clean_municipality_name(municipality: &str) -> String {
    let stripped = municipality.replace("kommune", "");
    let collapsed = WHITESPACE_RUN.replace_all(stripped.trim(), " ");
    if collapsed.is_empty() {
        return "Unknown".to_string();
    }
    collapsed
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_coordinates(text: &str) -> Vec<CoordinatePair> {
    let mut coordinates = Vec::new();
    for pattern in COORDINATE_PATTERNS.iter() {
        for caps in pattern.captures_iter(text).take(MAX_COORDINATES_PER_PATTERN) {
            coordinates.push(CoordinatePair {
                x: caps[1].to_string(),
                y: caps[2].to_string(),
            });
        }
    }
    coordinates
}

fn extract_dates(text: &str) -> Vec<DateMention> {
    let mut dates = Vec::new();
    for pattern in DATE_PATTERNS.iter() {
        for caps in pattern.captures_iter(text).take(MAX_DATES_PER_PATTERN) {
            let components: Vec<String> = (1..caps.len())
                .filter_map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                .collect();
            dates.push(DateMention {
                raw: caps[0].to_string(),
                components,
            });
        }
    }
    dates
}

fn extract_plan_type(haystack_lower: &str) -> Option<String> {
    PLAN_TYPES
        .iter()
        .find(|plan_type| haystack_lower.contains(*plan_type))
        .map(|plan_type| plan_type.to_string())
}

fn extract_area_figures(text: &str) -> Vec<AreaFigure> {
    let mut figures = Vec::new();
    for pattern in AREA_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            figures.push(AreaFigure {
                value: caps[1].to_string(),
                unit: caps
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            });
        }
    }
    figures
}

fn keyword_contexts(text: &str, table: &KeywordTable) -> Vec<KeywordContext> {
    let haystack_lower = text.to_lowercase();
    let mut contexts = Vec::new();

    for category in table.categories.values() {
        for keyword in &category.terms {
            if !haystack_lower.contains(keyword.to_lowercase().as_str()) {
                continue;
            }
            let pattern = match Regex::new(&format!(
                "(?i)(.{{0,50}}{}.{{0,50}})",
                regex::escape(keyword)
            )) {
                Ok(pattern) => pattern,
                Err(_) => continue,
            };
            for caps in pattern.captures_iter(text).take(MAX_CONTEXTS_PER_KEYWORD) {
                contexts.push(KeywordContext {
                    keyword: keyword.clone(),
                    context: caps[1].trim().to_string(),
                });
            }
        }
    }
    contexts
}

/// Analyze one document's extracted text against the keyword table.
pub fn analyze_document(text: &str, source_path: &str, table: &KeywordTable) -> DocumentAnalysis {
    let haystack_lower = text.to_lowercase();
    let hit = classify(text, table);

    DocumentAnalysis {
        source_path: source_path.to_string(),
        plan_id: first_capture(&PLAN_ID_PATTERNS, text),
        municipality: clean_municipality_name(
            &first_capture(&MUNICIPALITY_PATTERNS, text).unwrap_or_default(),
        ),
        coordinates: extract_coordinates(text),
        dates: extract_dates(text),
        plan_type: extract_plan_type(&haystack_lower),
        area_figures: extract_area_figures(text),
        keyword_contexts: keyword_contexts(text, table),
        matched_areas: hit.matched_areas,
        relevance_score: hit.score,
        content_stats: ContentStats {
            total_chars: text.chars().count(),
            total_words: text.split_whitespace().count(),
            total_lines: text.lines().count(),
        },
    }
}

impl DocumentAnalysis {
    /// Flatten the analysis into the collector handoff shape.
    pub fn into_record(self) -> RawRecord {
        let title = self.derived_title();

        let mut record = RawRecord::new(SourceTag::PdfExtract)
            .with_municipality(&self.municipality)
            .with_attribute("file_path", json!(self.source_path))
            .with_attribute("coordinates", json!(self.coordinates))
            .with_attribute("dates", json!(self.dates))
            .with_attribute("area_figures", json!(self.area_figures))
            .with_attribute("keyword_contexts", json!(self.keyword_contexts))
            .with_attribute("content_stats", json!(self.content_stats))
            .with_attribute(MATCHED_AREAS_ATTR, json!(self.matched_areas))
            .with_attribute(RELEVANCE_SCORE_ATTR, json!(self.relevance_score));

        if let Some(title) = title {
            record = record.with_title(title);
        }
        if let Some(plan_type) = &self.plan_type {
            record = record.with_attribute("plan_type", json!(plan_type));
        }
        if let Some(plan_id) = &self.plan_id {
            record = record.with_identifier(plan_id);
        }
        record
    }

    /// Synthesize a display title from the recognized plan type and
    /// municipality; documents with neither keep an empty title.
    fn derived_title(&self) -> Option<String> {
        let plan_type = self.plan_type.as_deref()?;
        let mut title: String = plan_type
            .char_indices()
            .map(|(i, c)| if i == 0 { c.to_ascii_uppercase() } else { c })
            .collect();
        if self.municipality != "Unknown" {
            title.push(' ');
            title.push_str(&self.municipality);
        }
        Some(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plansyn_recon::KeywordCategory;
    use std::collections::BTreeMap;

    const SAMPLE: &str = "\
Detaljregulering for Frogner.

Oslo kommune
Plan-ID: 2024-0142
Saksnummer: 22/04511

Planområdet ligger ved koordinatene 59.9139, 10.7522 og dekker
12,5 hektar. Vedtatt 15.03.2024, kunngjort 2024-04-01.
Areal: 125000.0 kvadratmeter totalt.";

    fn table() -> KeywordTable {
        let mut categories = BTreeMap::new();
        categories.insert(
            "districts".to_string(),
            KeywordCategory {
                weight: 2,
                terms: vec!["frogner".into(), "sagene".into()],
            },
        );
        categories.insert(
            "plan_terms".to_string(),
            KeywordCategory {
                weight: 3,
                terms: vec!["detaljregulering".into(), "reguleringsplan".into()],
            },
        );
        KeywordTable {
            area_category: "districts".into(),
            categories,
        }
    }

    #[test]
    fn sample_text_yields_full_analysis() {
        let analysis = analyze_document(SAMPLE, "plans/frogner.txt", &table());

        assert_eq!(analysis.plan_id.as_deref(), Some("2024-0142"));
        assert_eq!(analysis.municipality, "Oslo");
        assert_eq!(analysis.plan_type.as_deref(), Some("detaljregulering"));
        assert!(!analysis.coordinates.is_empty());
        assert_eq!(analysis.coordinates[0].x, "59.9139");
        assert!(analysis.dates.iter().any(|d| d.raw == "15.03.2024"));
        assert!(analysis.dates.iter().any(|d| d.raw == "2024-04-01"));
        assert!(analysis
            .area_figures
            .iter()
            .any(|a| a.value == "12,5" && a.unit == "hektar"));
        assert_eq!(analysis.matched_areas, ["frogner"]);
        assert_eq!(analysis.relevance_score, 2 + 3);
        assert!(analysis.content_stats.total_words > 20);
    }

    #[test]
    fn keyword_contexts_are_capped_per_keyword() {
        let text = "frogner a frogner b frogner c frogner d";
        let contexts = keyword_contexts(text, &table());
        let frogner_hits = contexts.iter().filter(|c| c.keyword == "frogner").count();
        assert!(frogner_hits <= MAX_CONTEXTS_PER_KEYWORD);
    }

    #[test]
    fn municipality_cleaning_strips_suffix_and_title_cases() {
        assert_eq!(clean_municipality_name("oslo kommune"), "Oslo");
        assert_eq!(clean_municipality_name("  nordre   follo  "), "Nordre Follo");
        assert_eq!(clean_municipality_name(""), "Unknown");
        assert_eq!(clean_municipality_name("kommune"), "Unknown");
    }

    #[test]
    fn record_carries_identifier_and_relevance() {
        let analysis = analyze_document(SAMPLE, "plans/frogner.txt", &table());
        let record = analysis.into_record();

        assert_eq!(record.source, SourceTag::PdfExtract);
        assert_eq!(record.identifier.as_deref(), Some("2024-0142"));
        assert_eq!(record.municipality.as_deref(), Some("Oslo"));
        assert_eq!(record.attributes[RELEVANCE_SCORE_ATTR], json!(5));
        assert_eq!(record.attributes[MATCHED_AREAS_ATTR], json!(["frogner"]));
        assert_eq!(record.attributes["plan_type"], json!("detaljregulering"));
    }

    #[test]
    fn textless_document_still_produces_an_analysis() {
        let analysis = analyze_document("", "plans/empty.txt", &table());
        assert_eq!(analysis.plan_id, None);
        assert_eq!(analysis.municipality, "Unknown");
        assert!(analysis.coordinates.is_empty());
        assert_eq!(analysis.relevance_score, 0);
        let record = analysis.into_record();
        assert_eq!(record.identifier, None);
        assert_eq!(record.title, None);
    }
}
