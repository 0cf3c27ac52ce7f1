//! HTTP fetch utilities, immutable document storage, and JSON snapshot
//! export for plansyn.

pub mod document;
pub mod fetch;
pub mod snapshot;

pub use document::{ArchivedDocument, DocumentArchive};
pub use fetch::{FetchError, FetchedResponse, HttpClientConfig, HttpFetcher, RetryPolicy};
pub use snapshot::write_snapshot;

pub const CRATE_NAME: &str = "plansyn-storage";
