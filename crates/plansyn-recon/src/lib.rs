//! Cross-source reconciliation of planning records: key generation, merge
//! resolution, municipality-relevance classification, and the aggregation
//! driver that folds per-source batches into one unified collection.
//!
//! Everything here is a synchronous in-memory transformation over batches
//! already fetched by the collector crates; the pass never performs I/O and
//! never fails, it always terminates with a best-effort result.

pub mod aggregate;
pub mod config;
pub mod key;
pub mod merge;
pub mod relevance;
pub mod report;
pub mod review;

pub use aggregate::{aggregate, AggregateOutcome, Coverage, SourceBatch};
pub use config::{KeywordCategory, KeywordTable};
pub use key::generate_key;
pub use merge::{merge_into, MATCHED_AREAS_ATTR, RELEVANCE_SCORE_ATTR};
pub use relevance::{classify, RelevanceHit};
pub use report::{build_report, AnalysisReport, QualityMetrics, ReportConfig};
pub use review::{near_duplicates, ReviewCandidate, ReviewConfig};

pub const CRATE_NAME: &str = "plansyn-recon";
