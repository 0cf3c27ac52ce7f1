//! Source collectors: map raw Geonorge/Origo API payloads and extracted
//! plan-document text into the minimal `RawRecord` handoff shape.
//!
//! Collectors own everything source-specific; the reconciliation core only
//! ever sees `RawRecord`s. A collector that fails to fetch yields an empty
//! batch, which the driver treats as "no records from that source".

pub mod doc;
pub mod geonorge;
pub mod origo;

use async_trait::async_trait;
use plansyn_core::{RawRecord, SourceTag};
use plansyn_storage::HttpFetcher;
use thiserror::Error;

pub use doc::{analyze_document, clean_municipality_name, DocumentAnalysis};
pub use geonorge::GeonorgeCollector;
pub use origo::OrigoCollector;

pub const CRATE_NAME: &str = "plansyn-adapters";

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("{0}")]
    Message(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error(transparent)]
    Fetch(#[from] plansyn_storage::FetchError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// An HTTP-backed source of raw planning records.
///
/// `fetch` and `parse` are split so parsing stays a pure function that can
/// be exercised against captured payload fixtures without a network.
#[async_trait]
pub trait SourceCollector: Send + Sync {
    fn source(&self) -> SourceTag;

    /// Fetch the raw payload text for one collection pass.
    async fn fetch(&self, http: &HttpFetcher) -> Result<String, CollectorError>;

    /// Map a raw payload into records.
    fn parse(&self, payload: &str) -> Result<Vec<RawRecord>, CollectorError>;
}

/// Fetch and parse in one step, degrading collector failures to an empty
/// batch so one broken source never takes down the whole pass.
pub async fn collect_or_empty(
    collector: &dyn SourceCollector,
    http: &HttpFetcher,
) -> Vec<RawRecord> {
    let payload = match collector.fetch(http).await {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(source = %collector.source(), %err, "fetch failed; continuing with empty batch");
            return Vec::new();
        }
    };
    match collector.parse(&payload) {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(source = %collector.source(), %err, "parse failed; continuing with empty batch");
            Vec::new()
        }
    }
}
