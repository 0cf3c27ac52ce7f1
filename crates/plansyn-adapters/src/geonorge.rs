//! Collector for the national Geonorge map catalogue.
//!
//! Queries the public search endpoint for regulatory-plan datasets and
//! normalizes each hit into a `RawRecord`. Geonorge does not expose a
//! municipality field directly, so it is recovered from the dataset title.

use std::sync::LazyLock;

use async_trait::async_trait;
use plansyn_core::{RawRecord, SourceTag};
use plansyn_storage::HttpFetcher;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{CollectorError, SourceCollector};

pub const DEFAULT_BASE_URL: &str = "https://kartkatalog.geonorge.no/api";
const METADATA_URL_PREFIX: &str = "https://kartkatalog.geonorge.no/metadata/";

static MUNICIPALITY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)([A-Za-zÆØÅæøå\s]+)\s+kommune",
        r"(?i)kommune[:\s]+([A-Za-zÆØÅæøå\s]+)",
        r"(?i)([A-Za-zÆØÅæøå]+)\s+reguleringsplan",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static municipality pattern"))
    .collect()
});

/// Recover a municipality name from a Geonorge dataset title.
///
/// Titles follow loose conventions ("Reguleringsplan for Bergen kommune",
/// "Kommune: Trondheim", "Stavanger reguleringsplan"); the first matching
/// convention wins. Unrecognized titles map to an empty string, which the
/// record model later normalizes to "unknown".
pub fn municipality_from_title(title: &str) -> String {
    for pattern in MUNICIPALITY_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(title) {
            if let Some(found) = caps.get(1) {
                let found = found.as_str().trim();
                if !found.is_empty() {
                    return found.to_string();
                }
            }
        }
    }
    String::new()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Results", default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "Uuid", default)]
    uuid: String,
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Organization", default)]
    organization: String,
    #[serde(rename = "Abstract", default)]
    r#abstract: String,
    #[serde(rename = "Theme", default)]
    theme: Vec<String>,
    #[serde(rename = "Keywords", default)]
    keywords: Vec<String>,
    #[serde(rename = "BoundingBox", default)]
    bounding_box: serde_json::Value,
    #[serde(rename = "DistributionDetails", default)]
    distribution_details: Vec<DistributionDetail>,
    #[serde(rename = "Updated", default)]
    updated: String,
}

#[derive(Debug, Deserialize)]
struct DistributionDetail {
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(rename = "Protocol", default)]
    protocol: String,
    #[serde(rename = "Name", default)]
    name: String,
}

#[derive(Debug, Clone)]
pub struct GeonorgeCollector {
    base_url: String,
    municipality: Option<String>,
    limit: usize,
}

impl GeonorgeCollector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            municipality: None,
            limit: 50,
        }
    }

    pub fn with_municipality(mut self, municipality: impl Into<String>) -> Self {
        self.municipality = Some(municipality.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn search_text(&self) -> String {
        match &self.municipality {
            Some(municipality) => format!("reguleringsplan {municipality}"),
            None => "reguleringsplan".to_string(),
        }
    }

    fn hit_to_record(hit: SearchHit) -> RawRecord {
        let municipality = municipality_from_title(&hit.title);
        let download_links: Vec<serde_json::Value> = hit
            .distribution_details
            .into_iter()
            .filter_map(|dist| {
                let url = dist.url?;
                Some(json!({
                    "url": url,
                    "protocol": dist.protocol,
                    "name": dist.name,
                }))
            })
            .collect();

        let mut record = RawRecord::new(SourceTag::Geonorge)
            .with_title(&hit.title)
            .with_municipality(&municipality)
            .with_attribute("organization", json!(hit.organization))
            .with_attribute("description", json!(hit.r#abstract))
            .with_attribute("theme", json!(hit.theme))
            .with_attribute("keywords", json!(hit.keywords))
            .with_attribute("bbox", hit.bounding_box)
            .with_attribute("download_links", json!(download_links))
            .with_attribute("last_updated", json!(hit.updated));

        if !hit.uuid.trim().is_empty() {
            record = record
                .with_identifier(&hit.uuid)
                .with_attribute("metadata_url", json!(format!("{METADATA_URL_PREFIX}{}", hit.uuid)));
        }
        record
    }
}

#[async_trait]
impl SourceCollector for GeonorgeCollector {
    fn source(&self) -> SourceTag {
        SourceTag::Geonorge
    }

    async fn fetch(&self, http: &HttpFetcher) -> Result<String, CollectorError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let text = self.search_text();
        let limit = self.limit.to_string();
        let params: &[(&str, &str)] = &[
            ("text", text.as_str()),
            ("limit", limit.as_str()),
            ("facets[0]name", "type"),
            ("facets[0]value", "dataset"),
        ];

        let response = http.fetch_with_params("geonorge", &url, params).await?;
        Ok(String::from_utf8_lossy(&response.body).into_owned())
    }

    fn parse(&self, payload: &str) -> Result<Vec<RawRecord>, CollectorError> {
        let response: SearchResponse = serde_json::from_str(payload)?;
        let records: Vec<RawRecord> = response
            .results
            .into_iter()
            .map(Self::hit_to_record)
            .collect();
        info!(count = records.len(), "parsed geonorge search results");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn municipality_recovered_from_title_conventions() {
        assert_eq!(
            municipality_from_title("Reguleringsplan for Bergen kommune"),
            "Reguleringsplan for Bergen"
        );
        assert_eq!(municipality_from_title("Kommune: Trondheim"), "Trondheim");
        assert_eq!(
            municipality_from_title("Stavanger reguleringsplan 2024"),
            "Stavanger"
        );
        assert_eq!(municipality_from_title("Nasjonal høydemodell"), "");
    }

    #[test]
    fn parse_maps_hits_to_records() {
        let payload = r#"{
            "NumFound": 1,
            "Results": [{
                "Uuid": "abc-123",
                "Title": "Detaljregulering Frogner, Oslo kommune",
                "Organization": "Oslo kommune",
                "Abstract": "Regulering av Frogner-området",
                "Theme": ["Planer"],
                "Keywords": ["reguleringsplan"],
                "BoundingBox": {"west": 10.6, "east": 10.8},
                "DistributionDetails": [
                    {"URL": "https://example.no/plan.sos", "Protocol": "W3C:AtomFeed", "Name": "SOSI"},
                    {"Protocol": "OGC:WMS", "Name": "no url, dropped"}
                ],
                "Updated": "2026-05-01T00:00:00"
            }]
        }"#;

        let collector = GeonorgeCollector::new(DEFAULT_BASE_URL);
        let records = collector.parse(payload).expect("parse");
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.source, SourceTag::Geonorge);
        assert_eq!(record.identifier.as_deref(), Some("abc-123"));
        assert_eq!(
            record.title.as_deref(),
            Some("Detaljregulering Frogner, Oslo kommune")
        );
        assert_eq!(record.municipality.as_deref(), Some("Oslo"));
        assert_eq!(
            record.attributes["metadata_url"],
            serde_json::json!("https://kartkatalog.geonorge.no/metadata/abc-123")
        );
        let links = record.attributes["download_links"]
            .as_array()
            .expect("links");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0]["url"], "https://example.no/plan.sos");
    }

    #[test]
    fn parse_tolerates_missing_results() {
        let collector = GeonorgeCollector::new(DEFAULT_BASE_URL);
        let records = collector.parse("{}").expect("parse");
        assert!(records.is_empty());
    }

    #[test]
    fn blank_uuid_yields_no_identifier() {
        let payload = r#"{"Results": [{"Title": "Plan uten id"}]}"#;
        let collector = GeonorgeCollector::new(DEFAULT_BASE_URL);
        let records = collector.parse(payload).expect("parse");
        assert_eq!(records[0].identifier, None);
        assert!(!records[0].attributes.contains_key("metadata_url"));
    }

    #[test]
    fn search_text_includes_municipality_filter() {
        let collector = GeonorgeCollector::new(DEFAULT_BASE_URL).with_municipality("Oslo");
        assert_eq!(collector.search_text(), "reguleringsplan Oslo");
    }
}
