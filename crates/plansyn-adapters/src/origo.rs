//! Collector for the Oslo Origo data platform.
//!
//! The dataset listing endpoint requires platform credentials; without
//! them the collector still parses captured listings, and the fetch path
//! reports a clear error naming the access contact. Every record from
//! this source belongs to the Oslo municipality.

use async_trait::async_trait;
use plansyn_core::{RawRecord, SourceTag};
use plansyn_storage::HttpFetcher;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{CollectorError, SourceCollector};

pub const ACCESS_CONTACT: &str = "dataplattform@oslo.kommune.no";

/// Listings arrive either as a bare array of datasets or wrapped in a
/// `{"datasets": [...]}` envelope depending on the endpoint version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    Wrapped { datasets: Vec<DatasetEntry> },
    Bare(Vec<DatasetEntry>),
}

#[derive(Debug, Deserialize)]
struct DatasetEntry {
    #[serde(default)]
    dataset_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    format: String,
    #[serde(default)]
    update_frequency: String,
}

#[derive(Debug, Clone)]
pub struct OrigoCollector {
    base_url: String,
    api_key: Option<String>,
}

impl OrigoCollector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn entry_to_record(entry: DatasetEntry) -> RawRecord {
        let mut record = RawRecord::new(SourceTag::OsloOrigo)
            .with_title(&entry.title)
            .with_municipality("Oslo")
            .with_attribute("description", json!(entry.description))
            .with_attribute("category", json!(entry.category))
            .with_attribute("format", json!(entry.format))
            .with_attribute("update_frequency", json!(entry.update_frequency))
            .with_attribute("contact", json!(ACCESS_CONTACT));

        if !entry.dataset_id.trim().is_empty() {
            record = record.with_identifier(&entry.dataset_id);
        }
        record
    }
}

#[async_trait]
impl SourceCollector for OrigoCollector {
    fn source(&self) -> SourceTag {
        SourceTag::OsloOrigo
    }

    async fn fetch(&self, http: &HttpFetcher) -> Result<String, CollectorError> {
        if self.api_key.is_none() {
            return Err(CollectorError::Message(format!(
                "oslo origo requires platform credentials; request access via {ACCESS_CONTACT}"
            )));
        }

        let url = format!("{}/datasets", self.base_url.trim_end_matches('/'));
        let response = http.fetch_bytes("oslo_origo", &url).await?;
        Ok(String::from_utf8_lossy(&response.body).into_owned())
    }

    fn parse(&self, payload: &str) -> Result<Vec<RawRecord>, CollectorError> {
        let listing: Listing = serde_json::from_str(payload)?;
        let entries = match listing {
            Listing::Wrapped { datasets } => datasets,
            Listing::Bare(entries) => entries,
        };
        let records: Vec<RawRecord> = entries.into_iter().map(Self::entry_to_record).collect();
        info!(count = records.len(), "parsed origo dataset listing");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[{
        "dataset_id": "oslo-regplan-001",
        "title": "Reguleringsplan for Bjørvika",
        "description": "Detaljregulering av Bjørvika-området",
        "category": "plandata",
        "format": "geojson",
        "update_frequency": "monthly"
    }]"#;

    #[test]
    fn bare_array_listing_parses() {
        let collector = OrigoCollector::new("https://api.oslo.kommune.no");
        let records = collector.parse(SAMPLE).expect("parse");
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.source, SourceTag::OsloOrigo);
        assert_eq!(record.identifier.as_deref(), Some("oslo-regplan-001"));
        assert_eq!(record.municipality.as_deref(), Some("Oslo"));
        assert_eq!(record.attributes["category"], "plandata");
        assert_eq!(record.attributes["contact"], ACCESS_CONTACT);
    }

    #[test]
    fn wrapped_listing_parses() {
        let payload = format!(r#"{{"datasets": {SAMPLE}}}"#);
        let collector = OrigoCollector::new("https://api.oslo.kommune.no");
        let records = collector.parse(&payload).expect("parse");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].title.as_deref(),
            Some("Reguleringsplan for Bjørvika")
        );
    }

    #[tokio::test]
    async fn fetch_without_credentials_names_the_contact() {
        let http = HttpFetcher::new(Default::default()).expect("client");
        let collector = OrigoCollector::new("https://api.oslo.kommune.no");
        let err = collector.fetch(&http).await.expect_err("no credentials");
        assert!(err.to_string().contains(ACCESS_CONTACT));
    }
}
