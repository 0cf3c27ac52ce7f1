//! One integration pass: collect, reconcile, report, snapshot.
//!
//! Batch order fixes merge precedence: the national catalogue first, the
//! Oslo platform second, document extracts last. Sources that are
//! disabled or failing contribute an empty batch instead of aborting
//! the pass.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use plansyn_adapters::{analyze_document, collect_or_empty, GeonorgeCollector, OrigoCollector};
use plansyn_core::{RawRecord, SourceTag};
use plansyn_recon::{
    aggregate, build_report, near_duplicates, AggregateOutcome, AnalysisReport, KeywordTable,
    ReportConfig, ReviewCandidate, ReviewConfig, SourceBatch,
};
use plansyn_storage::{write_snapshot, DocumentArchive, HttpClientConfig, HttpFetcher};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::AppConfig;

pub const SNAPSHOT_PREFIX: &str = "plansyn_data";

/// Everything one pass produces, in the shape the snapshot is written in.
#[derive(Debug, Serialize)]
pub struct IntegrationResult {
    pub outcome: AggregateOutcome,
    pub report: AnalysisReport,
    pub review_queue: Vec<ReviewCandidate>,
}

#[derive(Debug)]
pub struct IntegrationSummary {
    pub snapshot_path: PathBuf,
    pub total_records: usize,
    pub cross_reference_count: usize,
    pub coverage_percent: f64,
    pub review_queue_len: usize,
    pub documents_downloaded: usize,
}

/// Run one full pass and write the timestamped snapshot.
pub async fn run_integration(config: &AppConfig) -> Result<IntegrationSummary> {
    let table = KeywordTable::load(&config.keywords)?;
    let http = HttpFetcher::new(HttpClientConfig::default())?;

    let batches = vec![
        geonorge_batch(config, &http).await,
        origo_batch(config, &http).await,
        document_batch(config, &table)?,
    ];

    let mut documents_downloaded = 0;
    if config.downloads.enabled {
        let archive = DocumentArchive::new(&config.downloads.dir);
        for batch in &batches {
            documents_downloaded += download_plan_documents(&archive, &http, batch).await;
        }
    }

    let result = reconcile(batches, &table);
    let generated_at = Utc::now();
    let snapshot_path = write_snapshot(&config.output_dir, SNAPSHOT_PREFIX, generated_at, &result)?;

    Ok(IntegrationSummary {
        snapshot_path,
        total_records: result.outcome.unified_records.len(),
        cross_reference_count: result.outcome.cross_reference_count,
        coverage_percent: result.outcome.coverage.percent,
        review_queue_len: result.review_queue.len(),
        documents_downloaded,
    })
}

/// Fetch every download link advertised in a batch into the archive.
///
/// Failures are logged and skipped; a dead link never aborts the pass.
/// Returns the number of newly archived documents.
async fn download_plan_documents(
    archive: &DocumentArchive,
    http: &HttpFetcher,
    batch: &SourceBatch,
) -> usize {
    let source = batch.source.as_str();
    let mut archived = 0usize;

    for record in &batch.records {
        for url in download_urls(record) {
            let response = match http.fetch_bytes(source, &url).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(%url, %err, "document download failed");
                    continue;
                }
            };
            match archive.archive(source, &url, &response.body).await {
                Ok(document) if document.was_new => archived += 1,
                Ok(_) => {}
                Err(err) => warn!(%url, %err, "archiving document failed"),
            }
        }
    }

    if archived > 0 {
        info!(source, archived, "plan documents archived");
    }
    archived
}

/// Download URLs a record advertises, capped so one sprawling dataset
/// cannot dominate the run.
fn download_urls(record: &RawRecord) -> Vec<String> {
    const MAX_DOWNLOADS_PER_RECORD: usize = 3;

    record
        .attributes
        .get("download_links")
        .and_then(Value::as_array)
        .map(|links| {
            links
                .iter()
                .filter_map(|link| link.get("url").and_then(Value::as_str))
                .filter(|url| !url.trim().is_empty())
                .map(str::to_string)
                .take(MAX_DOWNLOADS_PER_RECORD)
                .collect()
        })
        .unwrap_or_default()
}

/// Reconcile previously saved batches without touching the network and
/// write a fresh snapshot. The batch file holds a JSON array of
/// `SourceBatch` values, the same shape `integrate` collects.
pub fn export_saved_batches(
    config: &AppConfig,
    batches_path: &std::path::Path,
) -> Result<IntegrationSummary> {
    let table = KeywordTable::load(&config.keywords)?;
    let raw = std::fs::read_to_string(batches_path)
        .with_context(|| format!("reading {}", batches_path.display()))?;
    let batches: Vec<SourceBatch> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", batches_path.display()))?;

    let result = reconcile(batches, &table);
    let snapshot_path =
        write_snapshot(&config.output_dir, SNAPSHOT_PREFIX, Utc::now(), &result)?;

    Ok(IntegrationSummary {
        snapshot_path,
        total_records: result.outcome.unified_records.len(),
        cross_reference_count: result.outcome.cross_reference_count,
        coverage_percent: result.outcome.coverage.percent,
        review_queue_len: result.review_queue.len(),
        documents_downloaded: 0,
    })
}

/// Reconcile collected batches and derive the report and review queue.
pub fn reconcile(batches: Vec<SourceBatch>, table: &KeywordTable) -> IntegrationResult {
    let outcome = aggregate(batches, table);
    let report = build_report(&outcome, &ReportConfig::default());
    let review_queue = near_duplicates(&outcome.unified_records, &ReviewConfig::default());

    info!(
        records = outcome.unified_records.len(),
        cross_referenced = outcome.cross_reference_count,
        coverage_percent = outcome.coverage.percent,
        review_candidates = review_queue.len(),
        "integration pass complete"
    );

    IntegrationResult {
        outcome,
        report,
        review_queue,
    }
}

async fn geonorge_batch(config: &AppConfig, http: &HttpFetcher) -> SourceBatch {
    if !config.geonorge.enabled {
        info!("geonorge source disabled");
        return SourceBatch::new(SourceTag::Geonorge, Vec::new());
    }

    let mut collector =
        GeonorgeCollector::new(&config.geonorge.base_url).with_limit(config.geonorge.limit);
    if let Some(municipality) = &config.geonorge.municipality {
        collector = collector.with_municipality(municipality);
    }
    SourceBatch::new(SourceTag::Geonorge, collect_or_empty(&collector, http).await)
}

async fn origo_batch(config: &AppConfig, http: &HttpFetcher) -> SourceBatch {
    if !config.oslo_origo.enabled {
        info!("oslo origo source disabled");
        return SourceBatch::new(SourceTag::OsloOrigo, Vec::new());
    }

    let mut collector = OrigoCollector::new(&config.oslo_origo.base_url);
    if let Some(api_key) = &config.oslo_origo.api_key {
        collector = collector.with_api_key(api_key);
    }
    SourceBatch::new(SourceTag::OsloOrigo, collect_or_empty(&collector, http).await)
}

/// Analyze every `*.txt` file in the configured documents directory.
///
/// Files are processed in name order so a re-run over the same directory
/// produces the same batch. A missing directory is an empty batch, not an
/// error; individual unreadable files are skipped with a warning.
fn document_batch(config: &AppConfig, table: &KeywordTable) -> Result<SourceBatch> {
    if !config.documents.enabled {
        info!("document source disabled");
        return Ok(SourceBatch::new(SourceTag::PdfExtract, Vec::new()));
    }

    let dir = &config.documents.dir;
    if !dir.is_dir() {
        info!(dir = %dir.display(), "documents directory absent; skipping");
        return Ok(SourceBatch::new(SourceTag::PdfExtract, Vec::new()));
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("txt"))
        .collect();
    paths.sort();

    let mut records: Vec<RawRecord> = Vec::new();
    for path in paths {
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping unreadable document");
                continue;
            }
        };
        let analysis = analyze_document(&text, &path.display().to_string(), table);
        records.push(analysis.into_record());
    }

    info!(count = records.len(), "analyzed plan documents");
    Ok(SourceBatch::new(SourceTag::PdfExtract, records))
}
