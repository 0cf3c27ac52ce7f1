//! Timestamped JSON snapshot export.
//!
//! The unified collection is never persisted to a durable store; each run
//! dumps its result to `<prefix>_<stamp>.json` and exits.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct SnapshotEnvelope<'a, T: Serialize> {
    generated_at: DateTime<Utc>,
    format_version: u32,
    data: &'a T,
}

/// Write `data` as a pretty-printed snapshot under `dir`, returning the
/// path written.
pub fn write_snapshot<T: Serialize>(
    dir: impl AsRef<Path>,
    prefix: &str,
    generated_at: DateTime<Utc>,
    data: &T,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let stamp = generated_at.format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{prefix}_{stamp}.json"));

    let envelope = SnapshotEnvelope {
        generated_at,
        format_version: 1,
        data,
    };
    let bytes = serde_json::to_vec_pretty(&envelope).context("serializing snapshot")?;
    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), "snapshot written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn snapshot_lands_in_timestamped_file() {
        let dir = tempdir().expect("tempdir");
        let generated_at = DateTime::parse_from_rfc3339("2026-08-31T09:30:00Z")
            .expect("ts")
            .with_timezone(&Utc);

        let data = json!({"unified_records": [], "cross_reference_count": 0});
        let path = write_snapshot(dir.path(), "plansyn_data", generated_at, &data).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "plansyn_data_20260831_093000.json"
        );
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["format_version"], 1);
        assert_eq!(written["data"]["cross_reference_count"], 0);
    }
}
